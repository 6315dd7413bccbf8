use clap::Parser;
use clap::error::ErrorKind;
use docx_convert::ConvertOptions;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "convert", about = "Convert a DOCX file to PDF")]
struct Args {
    /// Input DOCX file
    input: PathBuf,
    /// Output PDF file (overwritten)
    output: PathBuf,
    /// Further positional arguments are accepted and ignored
    #[arg(hide = true)]
    ignored: Vec<String>,
    /// TrueType/OpenType font to embed for body text
    #[arg(long, env = "DOCX_CONVERT_FONT")]
    font: Option<PathBuf>,
    /// TrueType/OpenType font for table headers (defaults to --font)
    #[arg(long, env = "DOCX_CONVERT_BOLD_FONT")]
    bold_font: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };
    if !args.ignored.is_empty() {
        log::debug!("Ignoring extra arguments: {:?}", args.ignored);
    }

    let options = ConvertOptions {
        font: args.font,
        bold_font: args.bold_font,
    };
    match docx_convert::convert_with_options(&args.input, &args.output, &options) {
        Ok(()) => println!("Success: {}", args.output.display()),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
