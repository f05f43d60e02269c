use clap::Parser;
use segmux_engine::CleanupPolicy;
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Record playlist segment downloader",
    long_about = "Downloads every segment referenced by a record playlist and joins them,\n\
                  in playlist order, into a single file using ffmpeg's concat demuxer.\n\
                  \n\
                  The playlist URL and output name come from flags, environment variables,\n\
                  or an interactive prompt for whatever is still missing."
)]
pub struct CliArgs {
    /// Playlist URL
    #[arg(
        short,
        long,
        env = "SEGMUX_URL",
        help = "URL of the record playlist to download"
    )]
    pub url: Option<String>,

    /// Output name without extension
    #[arg(
        short,
        long,
        env = "SEGMUX_NAME",
        help = "Output file name, without directory or extension"
    )]
    pub name: Option<String>,

    /// Output directory
    #[arg(
        short,
        long,
        default_value = "outputs",
        help = "Directory where the combined file will be saved"
    )]
    pub output_dir: PathBuf,

    #[arg(long, default_value = "mp4", help = "Extension of the combined file")]
    pub extension: String,

    #[arg(
        long,
        default_value = ".segments",
        help = "Directory holding downloaded segments until they are combined"
    )]
    pub staging_dir: PathBuf,

    #[arg(
        long,
        default_value = "concat.txt",
        help = "Path of the concat manifest passed to ffmpeg"
    )]
    pub manifest: PathBuf,

    /// Segment path pattern
    #[arg(
        long,
        help = "Regular expression locating segment paths in the playlist text"
    )]
    pub pattern: Option<String>,

    /// Number of concurrent segment downloads
    #[arg(
        short,
        long,
        default_value = "1",
        value_parser = clap::value_parser!(u32).range(1..=64),
        help = "Maximum number of concurrent segment downloads (1 downloads strictly in order)"
    )]
    pub concurrency: u32,

    #[arg(
        long,
        value_enum,
        default_value_t = CleanupPolicy::OnSuccess,
        help = "When to remove downloaded segments and the manifest"
    )]
    pub cleanup: CleanupPolicy,

    #[arg(
        long,
        env = "SEGMUX_FFMPEG",
        default_value = "ffmpeg",
        help = "Path to the ffmpeg executable"
    )]
    pub ffmpeg: PathBuf,

    /// Overall timeout in seconds
    #[arg(
        long,
        default_value = "60",
        help = "Overall timeout in seconds for each HTTP request (0 disables it)"
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    /// Read timeout in seconds
    #[arg(
        long,
        default_value = "30",
        help = "Read timeout in seconds (maximum time between receiving data chunks)"
    )]
    pub read_timeout: u64,

    /// Custom HTTP headers for download requests
    #[arg(
        long = "header",
        short = 'H',
        help = "Add custom HTTP header to requests (can be used multiple times). Format: 'Name: Value'",
        value_name = "HEADER"
    )]
    pub headers: Vec<String>,

    #[arg(long, help = "Override the User-Agent header")]
    pub user_agent: Option<String>,

    /// Proxy URL (e.g., "http://proxy.example.com:8080")
    #[arg(
        long,
        help = "Proxy server URL for downloads (e.g., \"http://proxy.example.com:8080\")"
    )]
    pub proxy: Option<String>,

    /// Proxy username
    #[arg(long, help = "Username for proxy authentication")]
    pub proxy_user: Option<String>,

    /// Proxy password
    #[arg(long, help = "Password for proxy authentication")]
    pub proxy_pass: Option<String>,

    /// Disable all proxy settings for downloads
    #[arg(
        long,
        help = "Disable all proxy settings (including system proxy) for downloads"
    )]
    pub no_proxy: bool,

    #[arg(
        long,
        help = "Fail instead of prompting when the URL or name is missing"
    )]
    pub no_prompt: bool,

    #[arg(long, help = "Hide the download progress bar")]
    pub no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,

    #[arg(long, default_value = "segmux.log", help = "Log file, truncated on start")]
    pub log_file: PathBuf,
}
