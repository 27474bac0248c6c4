use clap::{Parser, Subcommand};
use rwd_images::attributes::Attributes;
use rwd_images::image::{RenderContext, RwdImage, SizeRequest};
use rwd_images::media::{JsonLibrary, RequestInfo};
use rwd_images::{config, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rwd")]
#[command(about = "Responsive image markup for media library attachments")]
#[command(long_about = "\
Responsive image markup for media library attachments

Renders <img srcset>, <picture> and CSS background rules for an attachment,
using named responsive sets declared in TOML and size variants recorded in a
JSON media library.

Inputs:

  sets.toml       Responsive sets: ordered breakpoints with templates
                  (run 'rwd gen-config' for a documented sample)
  library.json    Upload directory, attachments with their stored size
                  variants, and featured images per page

Problems never fail a render: missing variants and unknown sets are reported
as HTML comments in front of the markup.")]
#[command(version)]
struct Cli {
    /// Responsive set definitions; repeat to layer files (later files win)
    #[arg(long = "sets", default_value = "sets.toml", global = true)]
    sets: Vec<PathBuf>,

    /// JSON media library
    #[arg(long, default_value = "library.json", global = true)]
    library: PathBuf,

    /// Render as if the request was served over HTTPS
    #[arg(long, global = true)]
    secure: bool,

    /// Host of the current request (HTTPS upgrade applies to this host only)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Current page id, used to find the featured image
    #[arg(long, global = true)]
    page: Option<u64>,

    /// Log cache and resolution details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that render an attachment.
#[derive(clap::Args, Clone)]
struct RenderArgs {
    /// Attachment id; omit to use the featured image of --page
    #[arg(long)]
    attachment: Option<u64>,

    /// Responsive set key
    #[arg(long)]
    size: String,

    /// Serve one breakpoint from another attachment (BREAKPOINT=ID)
    #[arg(long = "rewrite", value_parser = parse_key_val::<u64>)]
    rewrites: Vec<(String, u64)>,
}

impl RenderArgs {
    fn size_request(&self) -> SizeRequest {
        self.rewrites
            .iter()
            .fold(SizeRequest::new(&self.size), |request, (breakpoint, id)| {
                request.rewrite(breakpoint, *id)
            })
    }
}

#[derive(Subcommand)]
enum Command {
    /// Render a responsive <img> tag
    Img {
        #[command(flatten)]
        render: RenderArgs,

        /// Extra attribute on the tag (NAME=VALUE); class is appended
        #[arg(long = "attr", value_parser = parse_key_val::<String>)]
        attrs: Vec<(String, String)>,
    },
    /// Render a <picture> element
    Picture {
        #[command(flatten)]
        render: RenderArgs,

        /// Extra attribute on the <picture> tag (NAME=VALUE)
        #[arg(long = "attr", value_parser = parse_key_val::<String>)]
        attrs: Vec<(String, String)>,
    },
    /// Render background rules for a CSS selector as a <style> block
    Background {
        /// CSS selector receiving the background image
        #[arg(long)]
        selector: String,

        #[command(flatten)]
        render: RenderArgs,
    },
    /// Validate the set files and list every set
    Check,
    /// Print a sample sets.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let request = RequestInfo {
        secure: cli.secure,
        host: cli.host,
        page_id: cli.page,
    };
    let inputs = Inputs {
        sets: cli.sets,
        library: cli.library,
        request,
    };

    match cli.command {
        Command::Img { render, attrs } => with_context(inputs, |ctx| {
            let html = RwdImage::new(ctx, render.attachment)
                .img(render.size_request(), attrs.into_iter().collect::<Attributes>());
            println!("{}", html);
        })?,
        Command::Picture { render, attrs } => with_context(inputs, |ctx| {
            let html = RwdImage::new(ctx, render.attachment)
                .picture(render.size_request(), attrs.into_iter().collect::<Attributes>());
            println!("{}", html);
        })?,
        Command::Background { selector, render } => with_context(inputs, |ctx| {
            let comment = RwdImage::new(ctx, render.attachment)
                .background(&selector, render.size_request());
            print!("{}", comment);
            output::print_stylesheet(&ctx.take_styles());
        })?,
        Command::Check => {
            let registry = config::load_config(&inputs.sets)?;
            output::print_registry(&registry);
            println!("==> Sets are valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Files and request facts a render command works from.
struct Inputs {
    sets: Vec<PathBuf>,
    library: PathBuf,
    request: RequestInfo,
}

/// Load the registry and library, then run `render` against a fresh page
/// context.
fn with_context<F>(inputs: Inputs, render: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut RenderContext<'_>),
{
    let registry = config::load_config(&inputs.sets)?;
    let library = JsonLibrary::load(&inputs.library)?;
    let mut ctx = RenderContext::new(&library, &registry).with_request(inputs.request);
    render(&mut ctx);
    Ok(())
}

/// `--verbose` forces debug output; otherwise `RUST_LOG` decides, defaulting
/// to warnings only.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse `NAME=VALUE` pairs for `--rewrite` and `--attr`.
fn parse_key_val<T>(s: &str) -> Result<(String, T), String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let value = value
        .parse()
        .map_err(|e| format!("invalid value in '{s}': {e}"))?;
    Ok((name.to_string(), value))
}
