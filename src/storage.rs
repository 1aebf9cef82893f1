use crate::{
    browser,
    session::{ProgressSink, StageStats},
};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wasm_bindgen::JsValue;
use web_sys::Storage;

const PROGRESS_KEY: &str = "kids-platformer-progress";

/// Best result per stage number.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub stages: BTreeMap<u32, StageStats>,
}

impl Progress {
    /// Keeps `stats` if the stage was never cleared or the score beats the old one.
    pub fn record(&mut self, stage_number: u32, stats: &StageStats) -> bool {
        match self.stages.get(&stage_number) {
            Some(best) if best.score >= stats.score => false,
            _ => {
                self.stages.insert(stage_number, *stats);
                true
            }
        }
    }

    pub fn highest_cleared(&self) -> Option<u32> {
        self.stages.keys().next_back().copied()
    }
}

pub struct LocalStorageProgress {
    storage: Storage,
}

impl LocalStorageProgress {
    pub fn new() -> Result<Self> {
        Ok(LocalStorageProgress {
            storage: browser::local_storage()?,
        })
    }

    pub fn load(&self) -> Result<Progress> {
        let stored = self
            .storage
            .get_item(PROGRESS_KEY)
            .map_err(|err| anyhow!("Error reading progress {:#?}", err))?;

        match stored {
            Some(json) => js_sys::JSON::parse(&json)
                .map_err(|err| anyhow!("Stored progress is not JSON {:#?}", err))?
                .into_serde::<Progress>()
                .map_err(|err| anyhow!("Stored progress has the wrong shape {:#?}", err)),
            None => Ok(Progress::default()),
        }
    }

    fn store(&self, progress: &Progress) -> Result<()> {
        let value = JsValue::from_serde(progress)?;
        let json: String = js_sys::JSON::stringify(&value)
            .map_err(|err| anyhow!("Could not serialize progress {:#?}", err))?
            .into();

        self.storage
            .set_item(PROGRESS_KEY, &json)
            .map_err(|err| anyhow!("Error writing progress {:#?}", err))
    }
}

impl ProgressSink for LocalStorageProgress {
    fn save_stage_completion(&mut self, stage_number: u32, stats: &StageStats) -> Result<()> {
        let mut progress = self.load().unwrap_or_else(|err| {
            error!("Discarding unreadable progress {:#?}", err);
            Progress::default()
        });

        if progress.record(stage_number, stats) {
            self.store(&progress)?;
        }
        Ok(())
    }
}
