use std::io::{self, Write};

use tracker_core::{human_size, Phase, PreloadView, ProgressView, TrackerViewModel};

const BAR_WIDTH: usize = 30;

/// Prints frames to stdout, skipping frames identical to the previous one.
#[derive(Default)]
pub struct Renderer {
    last_frame: Vec<String>,
}

impl Renderer {
    pub fn draw(&mut self, view: &TrackerViewModel) {
        let frame = render(view);
        if frame == self.last_frame {
            return;
        }
        let mut out = io::stdout().lock();
        for line in &frame {
            let _ = writeln!(out, "{line}");
        }
        let _ = out.flush();
        self.last_frame = frame;
    }
}

/// Blocking notification for transport failures.
pub fn alert(message: &str) {
    eprintln!("!! {message}");
}

pub fn render(view: &TrackerViewModel) -> Vec<String> {
    let source = view.source_url.as_deref().unwrap_or("");
    let mut lines = Vec::new();

    match view.phase {
        Phase::Idle => lines.push("Ready.".to_string()),
        Phase::Previewing => lines.push(format!("Previewing {source} ...")),
        Phase::Downloading => {
            lines.push(format!("Downloading {source}"));
            if let Some(progress) = &view.progress {
                lines.extend(progress_lines(progress));
            }
        }
        Phase::GivenUp => lines.push(format!(
            "Giving up on {source}. The server may still finish it; try again later."
        )),
        Phase::Completed => {
            if let Some(link) = &view.result_link {
                lines.push(format!("Done: {link}"));
            }
            if let Some(email) = &view.owner_email {
                lines.push(format!(
                    "Done. The image is private; its owner ({email}) has been notified."
                ));
            }
            if let Some(line) = preload_line(&view.preload) {
                lines.push(line);
            }
        }
        Phase::Failed => match &view.error_panel {
            Some(message) => lines.push(format!("Error: {message}")),
            None => lines.push(format!("Failed to download {source}.")),
        },
    }

    lines
}

fn progress_lines(progress: &ProgressView) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(content_type) = &progress.content_type {
        lines.push(format!("  Content type: {content_type}"));
    }

    let expected = progress
        .expected
        .map(human_size)
        .unwrap_or_else(|| "not known :(".to_string());
    let mut status = format!("  {} of {}", human_size(progress.downloaded), expected);
    if let (Some(percentage), Some(left)) = (progress.percentage, progress.left) {
        status.push_str(&format!(
            " {} {percentage}% ({} left)",
            bar(percentage),
            human_size(left)
        ));
    }
    lines.push(status);
    lines
}

fn bar(percentage: u8) -> String {
    let filled = BAR_WIDTH * usize::from(percentage.min(100)) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

fn preload_line(preload: &PreloadView) -> Option<String> {
    if preload.fully_ready {
        return Some(format!("  All tiles ready ({} cached).", preload.loaded));
    }
    if !preload.active {
        return None;
    }
    let mut line = format!(
        "  Preloading tiles: {} cached, {} pending (round {}",
        preload.loaded, preload.pending, preload.rounds
    );
    if let Some(delay) = preload.next_round_in {
        line.push_str(&format!(", next check in {}s", delay.as_secs()));
    }
    line.push_str(").");
    Some(line)
}
