use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "jextract-gen")]
#[command(
    about = "Fetch jextract, generate Java FFM bindings and bundle native library loaders"
)]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "Path to jextract.toml (default: ./jextract.toml)"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Root directory for downloaded jextract builds"
    )]
    pub cache_dir: Option<PathBuf>,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Run jextract for every (or the named) library definition")]
    Generate {
        #[arg(
            long = "library",
            value_name = "NAME",
            help = "Only generate this library (repeatable)"
        )]
        libraries: Vec<String>,
    },

    #[command(about = "Download jextract if needed and print the launcher path")]
    Fetch {
        #[arg(long, help = "jextract version, e.g. 25-jextract+2-4")]
        version: Option<String>,
    },

    #[command(about = "Generate a native library loader without running jextract")]
    Loader {
        #[arg(long, help = "Java package of the header class")]
        package: String,

        #[arg(long, help = "Header class name, e.g. config_h")]
        base_name: String,

        #[arg(long, value_name = "DIR", help = "Source root jextract wrote to")]
        output: PathBuf,

        #[arg(
            long,
            help = "Resource path template, e.g. native/{os.name}-{os.arch}/mylib"
        )]
        resource_path: String,

        #[arg(long, value_name = "DIR", help = "Fixed extraction directory")]
        extraction_dir: Option<PathBuf>,

        #[arg(long, help = "Reuse extracted libraries keyed by content hash")]
        enable_caching: bool,

        #[arg(long, help = "Also inject the load() call into the header class")]
        inject: bool,
    },

    #[command(about = "Inject a loader call into an existing header class")]
    Inject {
        #[arg(long, value_name = "FILE", help = "Header class source file")]
        file: PathBuf,

        #[arg(long, help = "Header class name")]
        class: String,

        #[arg(long, help = "Loader class name")]
        loader: String,
    },

    #[command(about = "Print the resource a generated loader looks up on a host")]
    ResourcePath {
        #[arg(help = "Resource path template")]
        template: String,

        #[arg(long, requires = "arch", help = "os.name to classify (default: this host)")]
        os: Option<String>,

        #[arg(long, requires = "os", help = "os.arch to classify (default: this host)")]
        arch: Option<String>,
    },

    #[command(about = "Print the jextract download URL")]
    Url {
        #[arg(long, help = "jextract version, e.g. 25-jextract+2-4")]
        version: Option<String>,

        #[arg(long, help = "Platform id, e.g. linux-x64 (default: this host)")]
        platform: Option<String>,
    },
}
