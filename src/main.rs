use clap::Parser;
use kbt::cli::{Cli, Commands};
use miette::Result;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    match cli.command {
        Commands::Init(args) => kbt::cli::commands::init::run(args),
        Commands::Sup(cmd) => kbt::cli::commands::sup::run(cmd, &global),
        Commands::Mat(cmd) => kbt::cli::commands::mat::run(cmd, &global),
        Commands::Inv(cmd) => kbt::cli::commands::inv::run(cmd, &global),
        Commands::Completions(args) => kbt::cli::commands::completions::run(args),
    }
}
