//! Observable holder of the tab configuration being edited.
//!
//! Every mutation goes through layout repair before it is published, so
//! subscribers only ever see structurally valid layouts.

use chrono::{SecondsFormat, Utc};
use db::models::{fidget::FidgetInstanceDatum, grid_layout::GridItem, tab_config::TabConfiguration};
use serde_json::{Value, json};
use tokio::sync::watch;
use tracing::debug;
use utils::canonical;

use super::layout_repair::{self, GridBounds};

pub struct TabConfigStore {
    tx: watch::Sender<TabConfiguration>,
}

impl TabConfigStore {
    /// Wrap `config`, repairing it first.
    pub fn new(mut config: TabConfiguration) -> Self {
        layout_repair::repair_tab(&mut config);
        let (tx, _) = watch::channel(config);
        Self { tx }
    }

    pub fn snapshot(&self) -> TabConfiguration {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TabConfiguration> {
        self.tx.subscribe()
    }

    pub fn bounds(&self) -> GridBounds {
        GridBounds::for_tab(&self.tx.borrow())
    }

    pub fn update_layout(&self, layout: Vec<GridItem>) -> bool {
        self.mutate(|config| *config.layout_mut() = layout)
    }

    /// Add or replace a fidget instance together with its placement.
    pub fn upsert_fidget(&self, datum: FidgetInstanceDatum, placement: GridItem) -> bool {
        self.mutate(|config| {
            let id = datum.id.clone();
            config.fidget_instance_datums.insert(id.clone(), datum);
            let layout = config.layout_mut();
            match layout.iter_mut().find(|item| item.i == id) {
                Some(existing) => *existing = GridItem { i: id, ..placement },
                None => layout.push(GridItem { i: id, ..placement }),
            }
        })
    }

    pub fn remove_fidget(&self, id: &str) -> bool {
        self.mutate(|config| {
            config.fidget_instance_datums.remove(id);
            config.layout_mut().retain(|item| item.i != id);
        })
    }

    /// Re-run repair on the current configuration.
    pub fn repair(&self) -> bool {
        self.mutate(|_| {})
    }

    /// The current configuration as a tab file ready to be signed and sent.
    pub fn to_unsigned_file(
        &self,
        public_key: &str,
        file_name: &str,
    ) -> Result<Value, serde_json::Error> {
        let mut config = self.snapshot();
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        config.timestamp = Some(timestamp.clone());
        Ok(json!({
            "publicKey": public_key,
            "fileData": canonical::stringify(&config)?,
            "fileType": "json",
            "isEncrypted": false,
            "timestamp": timestamp,
            "fileName": file_name,
        }))
    }

    fn mutate(&self, edit: impl FnOnce(&mut TabConfiguration)) -> bool {
        self.tx.send_if_modified(|current| {
            let mut next = current.clone();
            edit(&mut next);
            layout_repair::repair_tab(&mut next);
            if next == *current {
                return false;
            }
            debug!(
                fidgets = next.fidget_instance_datums.len(),
                placements = next.layout().len(),
                "Tab configuration updated"
            );
            *current = next;
            true
        })
    }
}
