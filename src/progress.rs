use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

/// Callback type for reporting download progress.
/// Arguments: source URL, bytes downloaded, advertised total (if any), is_complete
pub type ProgressFn = Arc<dyn Fn(&str, u64, Option<u64>, bool) + Send + Sync>;

/// Whole percentage of `current` out of `total`, clamped to 100.
/// `None` when the total is unknown or zero.
pub fn percent(current: u64, total: Option<u64>) -> Option<u8> {
    match total {
        Some(total) if total > 0 => Some((current.saturating_mul(100) / total).min(100) as u8),
        _ => None,
    }
}

/// Returns the default progress function: an in-place percentage bar on stderr,
/// cleared once the download completes.
pub fn default_progress_fn(label: &str) -> ProgressFn {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template("{msg} {percent:>3}% [{bar:30}] {bytes}/{total_bytes}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.set_message(format!("[{label}] downloading"));

    Arc::new(move |_src: &str, current: u64, total: Option<u64>, complete: bool| {
        if let Some(total) = total {
            bar.set_length(total);
        }
        bar.set_position(current);
        if complete {
            bar.finish_and_clear();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_needs_a_known_total() {
        assert_eq!(percent(10, None), None);
        assert_eq!(percent(10, Some(0)), None);
    }

    #[test]
    fn percent_rounds_down_and_clamps() {
        assert_eq!(percent(0, Some(5000)), Some(0));
        assert_eq!(percent(2499, Some(5000)), Some(49));
        assert_eq!(percent(5000, Some(5000)), Some(100));
        assert_eq!(percent(6000, Some(5000)), Some(100));
    }

    #[test]
    fn default_progress_fn_accepts_updates() {
        let progress = default_progress_fn("tool");
        progress("http://x/a", 10, Some(100), false);
        progress("http://x/a", 100, Some(100), true);
    }
}
