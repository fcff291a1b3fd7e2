use env_logger::{Builder, Env, Target};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Install the process logger.
///
/// Level defaults to `info` and follows `RUST_LOG` when set. Output goes to
/// `file` (appended) when given, otherwise stderr.
pub fn init(file: Option<&Path>) -> io::Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {}",
            chrono::Local::now().format("%Y.%m.%d %H:%M:%S"),
            record.level(),
            record.args()
        )
    });

    if let Some(path) = file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}
