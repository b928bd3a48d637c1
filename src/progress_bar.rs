pub use crate::traits::Progress;

impl Progress for indicatif::ProgressBar {
    fn inc(&self, i: u64) {
        indicatif::ProgressBar::inc(self, i)
    }

    fn finish(&self) {
        indicatif::ProgressBar::finish(self)
    }
}

impl Progress for logbar::ProgressBar {
    fn inc(&self, i: u64) {
        logbar::ProgressBar::inc(self, i as usize)
    }

    fn finish(&self) {
        logbar::ProgressBar::finish(self)
    }
}

/// Event loop progress indicator
///
/// Interactive terminals get an `indicatif` bar, other outputs a
/// `logbar`. While a bar is shown, only warnings and errors are logged.
pub enum ProgressBar {
    Hidden,
    Indicatif(indicatif::ProgressBar, log::LevelFilter),
    Logbar(logbar::ProgressBar, log::LevelFilter),
}

impl Default for ProgressBar {
    fn default() -> Self {
        Self::Hidden
    }
}

impl ProgressBar {
    /// A progress bar over `len` events
    ///
    /// The bar is hidden unless the log level is exactly `info`: more
    /// verbose levels show per-event messages instead, and quieter
    /// levels ask for no output at all.
    pub fn new(len: u64, message: &str) -> Self {
        let level = log::max_level();
        if level != log::LevelFilter::Info {
            return Self::Hidden;
        }
        let bar = if console::Term::stderr().features().is_attended() {
            let bar = indicatif::ProgressBar::new(len);
            if let Ok(style) = indicatif::ProgressStyle::default_bar()
                .template("{bar:60.cyan/cyan} {msg} {pos}/{len} [{elapsed}]")
            {
                bar.set_style(style);
            }
            bar.set_message(message.to_owned());
            Self::Indicatif(bar, level)
        } else {
            eprintln!("{message}");
            let style = logbar::Style::new().indicator('█');
            Self::Logbar(logbar::ProgressBar::with_style(len as usize, style), level)
        };
        log::set_max_level(log::LevelFilter::Warn);
        bar
    }

    /// A progress bar that never shows anything
    pub fn hidden() -> Self {
        Self::Hidden
    }
}

impl Progress for ProgressBar {
    fn inc(&self, i: u64) {
        match self {
            Self::Hidden => {}
            Self::Indicatif(bar, _) => Progress::inc(bar, i),
            Self::Logbar(bar, _) => Progress::inc(bar, i),
        }
    }

    fn finish(&self) {
        match self {
            Self::Hidden => {}
            Self::Indicatif(bar, level) => {
                Progress::finish(bar);
                log::set_max_level(*level);
            }
            Self::Logbar(bar, level) => {
                Progress::finish(bar);
                log::set_max_level(*level);
            }
        }
    }
}
