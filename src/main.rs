use anyhow::Result;
use argh::FromArgs;
use diagsh::io_adapters::{LineSource, ScriptedInput, Terminal};
use diagsh::{Config, Environment, Interpreter, signal};
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(FromArgs)]
/// Interactive shell with history, environment, boot-sector, cron and memory-dump builtins.
struct Args {
    #[argh(option, default = "PathBuf::from(\"history.txt\")")]
    /// file the session history is written to on exit.
    history_file: PathBuf,

    #[argh(option, default = "PathBuf::from(\"/var/spool/cron\")")]
    /// directory listed by `\cron`.
    cron_dir: PathBuf,

    #[argh(option, default = "PathBuf::from(\"/tmp/vfs\")")]
    /// file `\cron` writes its listing into.
    snapshot_file: PathBuf,

    #[argh(option, default = "String::from(\"gcore\")")]
    /// program `\mem` runs with the process id.
    dump_tool: String,

    #[argh(option, default = "String::from(\"> \")")]
    /// prompt shown before each line.
    prompt: String,

    #[argh(switch)]
    /// do not print the welcome line.
    no_banner: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            history_file: args.history_file,
            cron_dir: args.cron_dir,
            snapshot_file: args.snapshot_file,
            dump_tool: args.dump_tool,
            prompt: args.prompt,
            banner: !args.no_banner,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args: Args = argh::from_env();

    if !signal::subscribe_reload() {
        log::debug!("reload notifications unavailable");
    }

    let mut shell = Interpreter::new(args.into(), Environment::new());
    let mut source: Box<dyn LineSource> = if std::io::stdin().is_terminal() {
        Box::new(Terminal::new()?)
    } else {
        Box::new(ScriptedInput::with_prompt(
            std::io::stdin().lock(),
            std::io::stdout(),
        ))
    };
    shell.repl(source.as_mut(), &mut std::io::stdout())?;
    log::debug!("{} reload notifications received", signal::reload_count());
    Ok(())
}
