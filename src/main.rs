use std::error;
use std::path;

use menoh_captioner::{server, Captioner, Config};
use serde_derive::Deserialize;
use tracing_subscriber::EnvFilter;

const USAGE: &'static str = r#"
Image captioning on Menoh

Usage:
  menoh-captioner caption [options] <src>...
  menoh-captioner serve [options]
  menoh-captioner (-h | --help)

Options:
  -h, --help              Show this screen.
  -c, --config <path>     YAML configuration file.
  --tokenizer <path>      Vocabulary file (Keras tokenizer JSON, word index JSON or .txt).
  --model <path>          Caption model (ONNX).
  --extractor <path>      Feature extractor (ONNX).
  --max-length <n>        Maximum number of decoding steps.
  --image-size <n>        Side of the square extractor input.
  --backend <name>        Menoh backend.
  --addr <address>        Address the upload page listens on.
"#;

#[derive(Debug, Deserialize)]
struct Args {
    cmd_caption: bool,
    cmd_serve: bool,
    arg_src: Vec<path::PathBuf>,
    flag_config: Option<path::PathBuf>,
    flag_tokenizer: Option<path::PathBuf>,
    flag_model: Option<path::PathBuf>,
    flag_extractor: Option<path::PathBuf>,
    flag_max_length: Option<usize>,
    flag_image_size: Option<usize>,
    flag_backend: Option<String>,
    flag_addr: Option<String>,
}

impl Args {
    fn into_config(self) -> Result<(Config, Self), Box<dyn error::Error>> {
        let mut config = match &self.flag_config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(p) = &self.flag_tokenizer {
            config.tokenizer_path = p.clone();
        }
        if let Some(p) = &self.flag_model {
            config.model_path = p.clone();
        }
        if let Some(p) = &self.flag_extractor {
            config.extractor_path = p.clone();
        }
        if let Some(n) = self.flag_max_length {
            config.max_length = n;
        }
        if let Some(n) = self.flag_image_size {
            config.image_size = n;
        }
        if let Some(b) = &self.flag_backend {
            config.backend = b.clone();
        }
        if let Some(a) = &self.flag_addr {
            config.server.address = a.clone();
        }
        Ok((config, self))
    }
}

fn main() -> Result<(), Box<dyn error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Args = docopt::Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());
    let (config, args) = args.into_config()?;
    let address = config.server.address.clone();

    let mut captioner = Captioner::from_config(config)?;

    if args.cmd_serve {
        server::serve(&mut captioner, &address)?;
    } else if args.cmd_caption {
        for src in &args.arg_src {
            match captioner.caption_path(src) {
                Ok(caption) => println!("{}", caption),
                Err(err) if err.is_decode() => {
                    eprintln!("{}: ERROR: {}", src.display(), err);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    Ok(())
}
