use std::fs::File;
use std::io::{self, Write};

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Sets up `env_logger` with `info` as the default level. With a `file`,
/// every record is written both to standard error and to that file.
pub fn init(debug: bool, file: Option<File>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp(None).format_target(false);

    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    if let Some(file) = file {
        builder.target(Target::Pipe(Box::new(Tee { file })));
    }

    builder.init();
}

struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}
