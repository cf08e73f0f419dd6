#![forbid(unsafe_code)]
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::{env, fs, io};

use log::{info, LevelFilter};
use thiserror::Error;
use torpack::compression::{compress_with, decompress, Algorithm, CompressedBlob, LzwConfig};

/// Extension appended to compressed files.
const EXTENSION: &str = "tor";

fn main() -> ExitCode {
    let flags = Flags::from_args(env::args_os());
    init_logging(flags.verbose);
    match run(flags) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Codec(#[from] torpack::Error),
    #[error("{} is empty", .0.display())]
    EmptyInput(PathBuf),
    #[error("Aborted. No gain, you shouldn't compress that file. (+{0} bytes)")]
    NoGain(usize),
}

#[derive(Debug)]
enum Operation {
    Compress,
    Decompress,
}

#[derive(Debug)]
struct Flags {
    input: PathBuf,
    output: Option<PathBuf>,
    operation: Operation,
    algorithm: Algorithm,
    max_code_width: u8,
    verbose: bool,
}

fn command() -> clap::Command<'static> {
    clap::Command::new("tor")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compress or decompress a file with Huffman or LZW coding")
        .arg(
            clap::Arg::new("decompress")
                .short('d')
                .long("decompress")
                .takes_value(false)
                .help("Decompress the file"),
        )
        .arg(
            clap::Arg::new("algo")
                .short('a')
                .long("algo")
                .takes_value(true)
                .default_value("lzw")
                .value_parser(|name: &str| name.parse::<Algorithm>())
                .help("Algorithm used for compression: huffman or lzw"),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_parser(clap::builder::ValueParser::path_buf())
                .help("Output file, defaults to the input name plus or minus .tor"),
        )
        .arg(
            clap::Arg::new("max_code_width")
                .short('w')
                .long("max-code-width")
                .takes_value(true)
                .value_parser(clap::value_parser!(u8).range(9..=24))
                .help("Largest LZW code width in bits"),
        )
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .takes_value(false)
                .help("Log what the codecs are doing"),
        )
        .arg(
            clap::Arg::new("file")
                .required(true)
                .value_parser(clap::builder::ValueParser::path_buf()),
        )
}

impl Flags {
    fn from_args(args: impl IntoIterator<Item = OsString>) -> Self {
        let matches = command().get_matches_from(args);

        let operation = if matches.contains_id("decompress") {
            Operation::Decompress
        } else {
            Operation::Compress
        };

        Flags {
            input: matches
                .get_one::<PathBuf>("file")
                .cloned()
                .unwrap_or_default(),
            output: matches.get_one::<PathBuf>("output").cloned(),
            operation,
            algorithm: matches
                .get_one::<Algorithm>("algo")
                .copied()
                .unwrap_or(Algorithm::Lzw),
            max_code_width: matches
                .get_one::<u8>("max_code_width")
                .copied()
                .unwrap_or_else(|| LzwConfig::default().max_code_width()),
            verbose: matches.contains_id("verbose"),
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn run(flags: Flags) -> Result<(), CliError> {
    let output = flags
        .output
        .clone()
        .unwrap_or_else(|| default_output(&flags.input, &flags.operation));

    let input = fs::read(&flags.input)?;
    if input.is_empty() {
        return Err(CliError::EmptyInput(flags.input));
    }
    info!("read {} bytes from {}", input.len(), flags.input.display());

    match flags.operation {
        Operation::Compress => {
            let config = LzwConfig::new(flags.max_code_width)?;
            let blob = compress_with(&input, flags.algorithm, config)?;
            let bytes = blob.serialize();
            if bytes.len() >= input.len() {
                return Err(CliError::NoGain(bytes.len() - input.len()));
            }
            println!("Compression gain : {:.2}%", blob.compression_rate());
            fs::write(&output, bytes)?;
        }
        Operation::Decompress => {
            let blob = CompressedBlob::deserialize(&input)?;
            info!("{} container, {} bytes", blob.algorithm(), blob.original_len());
            fs::write(&output, decompress(&blob)?)?;
        }
    }
    info!("wrote {}", output.display());
    Ok(())
}

/// `<input>.tor` when compressing; when decompressing, the input without its
/// `.tor` extension, or `<input>_extracted` if it has none.
fn default_output(input: &Path, operation: &Operation) -> PathBuf {
    match operation {
        Operation::Compress => {
            let mut name = input.as_os_str().to_owned();
            name.push(".");
            name.push(EXTENSION);
            PathBuf::from(name)
        }
        Operation::Decompress if input.extension().map_or(false, |ext| ext == EXTENSION) => {
            input.with_extension("")
        }
        Operation::Decompress => {
            let mut name = input.as_os_str().to_owned();
            name.push("_extracted");
            PathBuf::from(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_default_output_names() {
        assert_eq!(
            default_output(Path::new("image.ppm"), &Operation::Compress),
            PathBuf::from("image.ppm.tor")
        );
        assert_eq!(
            default_output(Path::new("image.ppm.tor"), &Operation::Decompress),
            PathBuf::from("image.ppm")
        );
        assert_eq!(
            default_output(Path::new("archive.bin"), &Operation::Decompress),
            PathBuf::from("archive.bin_extracted")
        );
    }

    #[test]
    fn test_flags() {
        let flags = Flags::from_args(args(&["tor", "notes.txt"]));
        assert!(matches!(flags.operation, Operation::Compress));
        assert_eq!(flags.algorithm, Algorithm::Lzw);
        assert_eq!(flags.input, PathBuf::from("notes.txt"));
        assert_eq!(flags.output, None);
        assert!(!flags.verbose);

        let flags = Flags::from_args(args(&[
            "tor", "-d", "-a", "huffman", "-o", "out.txt", "-v", "-w", "12", "notes.txt.tor",
        ]));
        assert!(matches!(flags.operation, Operation::Decompress));
        assert_eq!(flags.algorithm, Algorithm::Huffman);
        assert_eq!(flags.output, Some(PathBuf::from("out.txt")));
        assert_eq!(flags.max_code_width, 12);
        assert!(flags.verbose);
    }

    #[test]
    fn test_algorithm_flag_ignores_case() {
        for (name, algorithm) in [
            ("HUFFMAN", Algorithm::Huffman),
            ("Huffman", Algorithm::Huffman),
            ("hUfFmAn", Algorithm::Huffman),
            ("LZW", Algorithm::Lzw),
            ("Lzw", Algorithm::Lzw),
        ] {
            let flags = Flags::from_args(args(&["tor", "-a", name, "notes.txt"]));
            assert_eq!(flags.algorithm, algorithm);
        }
        assert!(command()
            .try_get_matches_from(args(&["tor", "-a", "deflate", "notes.txt"]))
            .is_err());
    }

    #[test]
    fn test_compress_then_decompress_files() {
        let dir = env::temp_dir().join(format!("tor-cli-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let original = dir.join("sample.txt");
        let data = b"a fairly repetitive line of text\n".repeat(64);
        fs::write(&original, &data).unwrap();

        for algorithm in Algorithm::ALL {
            let packed = dir.join(format!("sample.{}.tor", algorithm));
            let restored = dir.join(format!("sample.{}.out", algorithm));
            run(Flags {
                input: original.clone(),
                output: Some(packed.clone()),
                operation: Operation::Compress,
                algorithm,
                max_code_width: 12,
                verbose: false,
            })
            .unwrap();
            run(Flags {
                input: packed,
                output: Some(restored.clone()),
                operation: Operation::Decompress,
                algorithm,
                max_code_width: 12,
                verbose: false,
            })
            .unwrap();
            assert_eq!(fs::read(&restored).unwrap(), data);
        }

        let empty = dir.join("empty.txt");
        fs::write(&empty, b"").unwrap();
        let result = run(Flags {
            input: empty,
            output: None,
            operation: Operation::Compress,
            algorithm: Algorithm::Huffman,
            max_code_width: 16,
            verbose: false,
        });
        assert!(matches!(result, Err(CliError::EmptyInput(_))));

        let tiny = dir.join("tiny.txt");
        fs::write(&tiny, b"ab").unwrap();
        let result = run(Flags {
            input: tiny,
            output: None,
            operation: Operation::Compress,
            algorithm: Algorithm::Lzw,
            max_code_width: 16,
            verbose: false,
        });
        assert!(matches!(result, Err(CliError::NoGain(_))));

        fs::remove_dir_all(&dir).unwrap();
    }
}
