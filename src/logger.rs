use std::io::{self, Write};

use concolor_clap::ColorChoice;
use env_logger::{fmt::Formatter, WriteStyle};
use log::{Level, LevelFilter, Record};

pub fn init(level: LevelFilter, color: ColorChoice) {
    env_logger::Builder::new()
        .format(format)
        .filter_level(level)
        .write_style(write_style(color))
        .init();
}

pub fn level_from_args(verbose: u8, quiet: u8) -> LevelFilter {
    let verbosity = i16::from(verbose) - i16::from(quiet);
    match verbosity {
        i16::MIN..=-2 => LevelFilter::Error,
        -1 => LevelFilter::Warn,
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[allow(unreachable_patterns)]
fn write_style(color: ColorChoice) -> WriteStyle {
    match color {
        ColorChoice::Always => WriteStyle::Always,
        ColorChoice::Never => WriteStyle::Never,
        _ => WriteStyle::Auto,
    }
}

fn format(f: &mut Formatter, record: &Record) -> io::Result<()> {
    let args = record.args();
    let level = record.level();
    if let Some(prefix) = level_prefix(level) {
        let style = f.default_level_style(level);
        writeln!(f, "{style}{prefix}{style:#}{args}")
    } else {
        writeln!(f, "{args}")
    }
}

fn level_prefix(level: Level) -> Option<&'static str> {
    match level {
        Level::Debug | Level::Trace | Level::Info => None,
        Level::Warn => Some("warning: "),
        Level::Error => Some("error: "),
    }
}

#[cfg(test)]
mod tests {
    use log::LevelFilter;

    use super::level_from_args;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_from_args(0, 0), LevelFilter::Info);
        assert_eq!(level_from_args(1, 0), LevelFilter::Debug);
        assert_eq!(level_from_args(5, 0), LevelFilter::Trace);
        assert_eq!(level_from_args(0, 1), LevelFilter::Warn);
        assert_eq!(level_from_args(0, 7), LevelFilter::Error);
    }
}
