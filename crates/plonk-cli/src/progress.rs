//! Bridges operation events to indicatif spinners on stderr.

use std::{collections::HashMap, sync::mpsc::Receiver, thread::JoinHandle, time::Duration};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use plonk_events::{ItemStage, PlonkEvent};

pub fn spawn_renderer(rx: Receiver<PlonkEvent>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let multi = MultiProgress::new();
        let style = ProgressStyle::with_template("{spinner} {msg}")
            .expect("static template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");
        let mut bars: HashMap<u64, ProgressBar> = HashMap::new();

        for event in rx {
            match event {
                PlonkEvent::ItemStarted {
                    op_id,
                    name,
                    manager,
                    stage,
                } => {
                    let verb = match stage {
                        ItemStage::Installing => "installing",
                        ItemStage::Uninstalling => "uninstalling",
                        ItemStage::Upgrading => "upgrading",
                        ItemStage::Deploying => "deploying",
                        ItemStage::RecordingLock => "recording",
                    };
                    let label = match manager {
                        Some(manager) => format!("{verb} {manager}:{name}"),
                        None => format!("{verb} {name}"),
                    };
                    let bar = bars.entry(op_id).or_insert_with(|| {
                        let bar = multi.add(ProgressBar::new_spinner());
                        bar.set_style(style.clone());
                        bar.enable_steady_tick(Duration::from_millis(100));
                        bar
                    });
                    bar.set_message(label);
                }
                PlonkEvent::ItemComplete { op_id, .. }
                | PlonkEvent::ItemFailed { op_id, .. }
                | PlonkEvent::ItemSkipped { op_id, .. } => {
                    if let Some(bar) = bars.remove(&op_id) {
                        bar.finish_and_clear();
                    }
                }
                _ => {}
            }
        }

        for bar in bars.into_values() {
            bar.finish_and_clear();
        }
    })
}
