mod commands;
mod examples;
mod output;
mod theme;

use std::fmt::Write;
use std::io::{self, Write as IoWrite};
use std::path::PathBuf;

use anyhow::Result;
use clap::{
    ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Style},
    },
    error::ErrorKind,
};
use colored::{Color as ThemeColor, Colorize, control::ShouldColorize};

use commands::{config::handle_config, tour::handle_tour, watch::handle_watch};
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ICONS, THEME};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("REDIS_URL", "Redis connection URL used by `watch`"),
    ("RUST_LOG", "Log filter, e.g. `chirp=debug`"),
];

#[derive(Parser)]
#[command(name = "chirp")]
#[command(version)]
#[command(
    about = "Headless micro-blogging client",
    long_about = r#"Drives the chirp client core from the command line:

• A scripted session against in-memory collaborators
• A live view of the feed stored in Redis
• Inspection of the effective configuration

Commands:
  tour      Run a scripted session in memory
  watch     Follow the live feed in Redis
  config    Print the effective configuration
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Path to a configuration file (defaults to .chirp/config.toml)
    #[arg(long, global = true, env = "CHIRP_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn parse_with_styles() -> Self {
        let command = build_cli_command();
        let err = match command.styles(help_styles()).try_get_matches() {
            Ok(matches) => match Cli::from_arg_matches(&matches) {
                Ok(cli) => return cli,
                Err(err) => err,
            },
            Err(err) => err,
        };

        match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = print_blank_line_stdout();
                if let Err(print_err) = err.print()
                    && print_err.kind() != io::ErrorKind::BrokenPipe
                {
                    eprintln!("Failed to display help: {print_err}");
                }
                let _ = print_blank_line_stdout();
                std::process::exit(0);
            }
            _ => {
                let exit_code = err.exit_code();
                let _ = print_blank_line_stderr();
                if let Err(print_err) = err.print()
                    && print_err.kind() != io::ErrorKind::BrokenPipe
                {
                    eprintln!("Failed to display error: {print_err}");
                }
                let _ = print_blank_line_stderr();
                std::process::exit(exit_code);
            }
        }
    }
}

fn build_cli_command() -> Command {
    let use_color = detect_color_support();
    let appendix = render_top_level_appendix(use_color);
    let mut command = Cli::command().after_long_help(appendix);
    command = command.color(if use_color { ColorChoice::Auto } else { ColorChoice::Never });
    attach_command_examples(&mut command, use_color);
    command
}

fn attach_command_examples(command: &mut Command, use_color: bool) {
    for example in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(example.name) {
            let help_text = render_examples(example.groups, use_color);
            *subcommand = subcommand.clone().after_long_help(help_text);
        }
    }
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let heading = stylize("Examples:", theme.accent, true, use_color);
    let _ = writeln!(buffer, "{heading}");

    for (index, group) in groups.iter().enumerate() {
        let title = stylize(group.title, theme.title, true, use_color);
        let _ = writeln!(buffer, "  {title}");

        for command in group.commands {
            let arrow = stylize(ICONS.arrow, theme.step, false, use_color);
            let command_text = stylize(command, theme.step, false, use_color);
            let _ = writeln!(buffer, "    {arrow} {command_text}");
        }

        if index + 1 < groups.len() {
            buffer.push('\n');
        }
    }

    buffer
}

fn render_top_level_appendix(use_color: bool) -> String {
    let theme = &THEME;
    let mut buffer = String::new();

    let env_heading = stylize("Environment Variables:", theme.accent, true, use_color);
    let _ = writeln!(buffer, "{env_heading}");
    for (key, description) in ENVIRONMENT_VARIABLES {
        let key_text = stylize(key, theme.key, true, use_color);
        let value_text = stylize(description, theme.value, false, use_color);
        let _ = writeln!(buffer, "  {key_text}  {value_text}");
    }

    buffer.push('\n');

    let tip_heading = stylize("Tip:", theme.accent, true, use_color);
    let tip_text = stylize(
        "Use 'chirp <command> --help' to view examples for each command.",
        theme.step,
        false,
        use_color,
    );
    let _ = writeln!(buffer, "{tip_heading} {tip_text}");

    buffer
}

fn print_blank_line_stdout() -> io::Result<()> {
    let mut stdout = io::stdout();
    IoWrite::write_all(&mut stdout, b"\n")?;
    IoWrite::flush(&mut stdout)
}

fn print_blank_line_stderr() -> io::Result<()> {
    let mut stderr = io::stderr();
    IoWrite::write_all(&mut stderr, b"\n")?;
    IoWrite::flush(&mut stderr)
}

fn stylize(text: &str, color: ThemeColor, bold: bool, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    let styled = text.color(color);
    if bold { styled.bold().to_string() } else { styled.to_string() }
}

fn detect_color_support() -> bool {
    ShouldColorize::from_env().should_colorize()
}

fn help_styles() -> Styles {
    let color = |ansi: AnsiColor| Style::new().fg_color(Some(ansi.into()));
    Styles::styled()
        .usage(color(AnsiColor::BrightBlue).bold())
        .header(color(AnsiColor::Cyan).bold())
        .literal(color(AnsiColor::Magenta))
        .placeholder(color(AnsiColor::BrightBlack))
        .valid(color(AnsiColor::Green))
        .invalid(color(AnsiColor::Yellow))
        .error(color(AnsiColor::Red).bold())
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted session against in-memory collaborators
    Tour {
        /// Display name of the tour account
        #[arg(long, default_value = "tourist")]
        name: String,
    },

    /// Follow the live feed stored in Redis until Ctrl-C
    Watch {
        /// Number of posts to follow (defaults to the configured feed limit)
        #[arg(long)]
        limit: Option<usize>,

        /// Follow only the posts of this user id
        #[arg(long)]
        user: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse_with_styles();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output.clone(),
        quiet: cli.quiet,
        no_color: cli.no_color,
    });

    let _ = print_blank_line_stdout();

    match execute(cli, &output).await {
        Ok(()) => {
            let _ = print_blank_line_stdout();
        }
        Err(err) => {
            output.error(&format!("{err:#}"));
            let _ = print_blank_line_stdout();
            std::process::exit(1);
        }
    }
}

async fn execute(cli: Cli, output: &OutputManager) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Tour { name } => {
            handle_tour(config_path, &name, output).await?;
        }
        Commands::Watch { limit, user } => {
            handle_watch(config_path, limit, user.as_deref(), output).await?;
        }
        Commands::Config => {
            handle_config(config_path, output)?;
        }
    }

    Ok(())
}
