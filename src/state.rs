use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::Result;

use crate::color::CategoryColors;
use crate::data::filter::{DateWindow, filtered_indices};
use crate::data::loader::load_file;
use crate::data::model::{Facet, JobDataset};
use crate::data::payload::DashboardPayloads;
use crate::store::{FilterSelection, FilterStore};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

type LoadResult = (PathBuf, Result<JobDataset>);

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Loaded dataset (None until user loads a file).
    pub dataset: Option<JobDataset>,

    /// Shared filters and active item, observed by every chart.
    pub store: FilterStore,

    /// Chart inputs for the current dataset, date window and filters.
    pub payloads: Option<DashboardPayloads>,
    generation: u64,
    /// Filters the payloads and counts were last built for.
    built_for: FilterSelection,

    /// Restricts every chart to postings in this window.
    pub date_window: DateWindow,

    /// Colour of every category, shared by all charts.
    pub colors: CategoryColors,

    /// Postings passing the date window and the filters.
    pub visible_count: usize,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether a file loading operation is in progress.
    pub loading: bool,
    pending: Option<Receiver<LoadResult>>,

    /// File the current dataset came from.
    pub source: Option<PathBuf>,
}

impl AppState {
    /// Ingest a newly loaded dataset: fresh filters, colours and payloads.
    pub fn set_dataset(&mut self, dataset: JobDataset) {
        self.store.clear();
        self.colors = CategoryColors::for_dataset(&dataset);
        self.date_window = None;
        self.dataset = Some(dataset);
        self.rebuild_payloads();
        self.status_message = None;
        self.loading = false;
    }

    /// Recompute chart payloads and counts; charts notice through the new
    /// generation.
    pub fn rebuild_payloads(&mut self) {
        self.generation += 1;
        self.built_for = self.store.read().clone();
        let (window, selection, generation) = (self.date_window, &self.built_for, self.generation);
        self.payloads = self
            .dataset
            .as_ref()
            .map(|ds| DashboardPayloads::build(ds, window, selection, generation));
        self.visible_count = self
            .dataset
            .as_ref()
            .map_or(0, |ds| filtered_indices(ds, selection, window).len());
    }

    pub fn set_date_window(&mut self, window: DateWindow) {
        if window != self.date_window {
            self.date_window = window;
            self.rebuild_payloads();
        }
    }

    /// Rebuild payloads and counts if the filters changed since the last
    /// build.  Hovering alone never triggers a rebuild.  Returns whether
    /// anything was rebuilt.
    pub fn sync_filters(&mut self) -> bool {
        if *self.store.read() == self.built_for {
            return false;
        }
        log::debug!("filters changed; rebuilding chart payloads");
        self.rebuild_payloads();
        true
    }

    // -----------------------------------------------------------------------
    // Background loading
    // -----------------------------------------------------------------------

    /// Load `path` on a worker thread.  Charts show their loading state until
    /// [`AppState::poll_load`] picks up the result.
    pub fn start_load(&mut self, path: &Path) {
        let (tx, rx) = mpsc::channel();
        let path = path.to_path_buf();
        log::info!("Loading {}", path.display());
        self.loading = true;
        self.status_message = None;
        self.pending = Some(rx);
        thread::spawn(move || {
            let result = load_file(&path);
            // The receiver is gone if the app closed meanwhile.
            let _ = tx.send((path, result));
        });
    }

    /// Install a finished background load, if any.  Returns true when the
    /// loading state changed.
    pub fn poll_load(&mut self) -> bool {
        let Some(rx) = &self.pending else {
            return false;
        };
        match rx.try_recv() {
            Ok((path, result)) => {
                self.pending = None;
                self.finish_load(path, result);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                self.loading = false;
                self.status_message = Some("Error: loader stopped unexpectedly".to_string());
                true
            }
        }
    }

    fn finish_load(&mut self, path: PathBuf, result: Result<JobDataset>) {
        match result {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} postings from {} ({} locations, {} industries)",
                    dataset.len(),
                    path.display(),
                    dataset.values(Facet::Location).len(),
                    dataset.values(Facet::Industry).len(),
                );
                self.set_dataset(dataset);
                self.source = Some(path);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                self.loading = false;
            }
        }
    }
}
