use std::{sync::Arc, time::Duration};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use segmux_engine::PipelineEvent;

const DOWNLOAD_TEMPLATE: &str =
    "Downloading segments [{bar:40.cyan/blue}] {percent}% | {pos}/{len}";

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(DOWNLOAD_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg} [{elapsed_precise}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

#[derive(Default)]
struct Bars {
    download: Option<ProgressBar>,
    assemble: Option<ProgressBar>,
}

/// Renders pipeline events as terminal progress bars.
#[derive(Clone)]
pub struct ProgressManager {
    multi: MultiProgress,
    bars: Arc<Mutex<Bars>>,
    disabled: bool,
}

impl ProgressManager {
    pub fn new(multi: MultiProgress) -> Self {
        Self {
            multi,
            bars: Arc::new(Mutex::new(Bars::default())),
            disabled: false,
        }
    }

    pub fn new_disabled(multi: MultiProgress) -> Self {
        Self {
            disabled: true,
            ..Self::new(multi)
        }
    }

    pub fn handle_event(&self, event: PipelineEvent) {
        if self.disabled {
            return;
        }

        let mut bars = self.bars.lock();
        match event {
            PipelineEvent::PlaylistFetched { .. } => {}
            PipelineEvent::SegmentsParsed { total } => {
                let bar = self.multi.add(ProgressBar::new(total as u64));
                bar.set_style(download_style());
                bars.download = Some(bar);
            }
            PipelineEvent::SegmentStaged { .. } => {
                if let Some(bar) = &bars.download {
                    bar.inc(1);
                    if bar.position() >= bar.length().unwrap_or(0) {
                        bar.finish();
                    }
                }
            }
            PipelineEvent::Assembling { output, .. } => {
                let spinner = self.multi.add(ProgressBar::new_spinner());
                spinner.set_style(spinner_style());
                spinner.set_message(format!("Combining segments into {}", output.display()));
                spinner.enable_steady_tick(Duration::from_millis(120));
                bars.assemble = Some(spinner);
            }
            PipelineEvent::Assembled { output } => {
                if let Some(spinner) = bars.assemble.take() {
                    spinner.finish_with_message(format!("Combined into {}", output.display()));
                }
            }
            PipelineEvent::CleanedUp { .. } => {
                if let Some(bar) = bars.download.take() {
                    bar.finish();
                }
            }
        }
    }

    /// Drops unfinished bars, used when a run fails midway.
    pub fn abandon(&self) {
        let mut bars = self.bars.lock();
        if let Some(bar) = bars.download.take() {
            bar.abandon();
        }
        if let Some(spinner) = bars.assemble.take() {
            spinner.abandon();
        }
    }

    #[inline]
    #[allow(unused)]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[cfg(test)]
    fn download_position(&self) -> Option<(u64, Option<u64>)> {
        self.bars
            .lock()
            .download
            .as_ref()
            .map(|bar| (bar.position(), bar.length()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;
    use std::path::PathBuf;

    fn hidden() -> MultiProgress {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn staged(index: usize) -> PipelineEvent {
        PipelineEvent::SegmentStaged {
            index,
            total: 3,
            bytes: 188,
            path: PathBuf::from(format!(".segments/seg{index}.ts")),
        }
    }

    #[test]
    fn test_download_bar_follows_staged_segments() {
        let progress = ProgressManager::new(hidden());
        progress.handle_event(PipelineEvent::SegmentsParsed { total: 3 });
        progress.handle_event(staged(0));
        progress.handle_event(staged(1));

        assert_eq!(progress.download_position(), Some((2, Some(3))));

        progress.handle_event(PipelineEvent::CleanedUp { removed: 4 });
        assert_eq!(progress.download_position(), None);
    }

    #[test]
    fn test_disabled_manager_ignores_events() {
        let progress = ProgressManager::new_disabled(hidden());
        assert!(progress.is_disabled());
        progress.handle_event(PipelineEvent::SegmentsParsed { total: 3 });
        progress.handle_event(staged(0));
        assert_eq!(progress.download_position(), None);
    }

    #[test]
    fn test_abandon_clears_bars() {
        let progress = ProgressManager::new(hidden());
        progress.handle_event(PipelineEvent::SegmentsParsed { total: 3 });
        progress.abandon();
        assert_eq!(progress.download_position(), None);
    }
}
