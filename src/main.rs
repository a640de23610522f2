use anyhow::Result;
use ish::Interpreter;
use ish::config::{self, Options};
use ish::external;

fn main() -> Result<()> {
    let options: Options = argh::from_env();
    config::init_logging(&options.log_filter())?;

    let prog_name = std::env::args_os()
        .next()
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ish".to_string());

    external::ignore_interrupts()?;

    let mut sh = Interpreter::new(prog_name);
    if let Some(path) = options.startup_file(sh.env()) {
        sh.run_startup_file(&path);
    }
    if !sh.should_exit() {
        sh.repl()?;
    }
    Ok(())
}
