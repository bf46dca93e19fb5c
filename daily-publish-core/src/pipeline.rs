//! High-level pipeline: turns a bundle name into a published content document.
//!
//! The run is a forward-only sequence of stages:
//!
//! `Validate -> InitBranch -> DiscoverAssets -> ProcessAssets -> GenerateTexts ->
//! ReviewTexts -> GenerateArtwork -> PersistRecords -> RenderDocument ->
//! {Publish | SkipPublish} -> MirrorLocal -> Done`
//!
//! Each stage takes the [`RunState`] by value and hands back the updated state.
//!
//! # Error Handling
//! - Fatal ([`PublishError`]): bad name, git failure, daily record insert failure,
//!   closed prompt input, unreadable corpus, filesystem failure while discovering
//!   or rendering. The run stops and the error goes back to the caller.
//! - Per item: an asset that cannot be read or uploaded, a dependent record that
//!   cannot be inserted, cover art that cannot be made. Logged, recorded in
//!   [`RunState::skipped`], and the run carries on without it.
//! - Mirror: logged with a manual hint in [`RunState::mirror_failures`]; never
//!   affects the outcome.
//!
//! # Invariants
//! - `AudioAsset::remote_url` is only set by a completed upload.
//! - Dependent records are only attempted with a daily id in hand.
//! - Publish (commit and push) only happens if at least one asset was uploaded.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::config::{GenerationConfig, GitConfig, PathsConfig, PublishConfig};
use crate::contract::{
    ArtworkGenerator, AudioPlayer, AudioRecord, DailyRecord, Prompt, RemoteStore, TextRecord,
    VersionControl,
};
use crate::discover::{self, AssetSource};
use crate::duration::{self, ParsedDuration};
use crate::error::{AssetError, MirrorError, PublishError, RecordError};
use crate::markov::MarkovChain;
use crate::mirror;
use crate::model::{sanitize_name, AudioAsset, GeneratedText, PublishRequest};
use crate::render::{self, DocumentInputs};
use crate::review;

/// The external collaborators a run talks to.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub store: &'a dyn RemoteStore,
    pub vcs: &'a dyn VersionControl,
    pub prompt: &'a dyn Prompt,
    pub player: &'a dyn AudioPlayer,
    pub artwork: &'a dyn ArtworkGenerator,
}

/// What the operator typed.
#[derive(Debug, Clone)]
pub struct PublishArgs {
    pub name: String,
    pub description: String,
    /// Date used when the name does not start with one.
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    InitBranch,
    DiscoverAssets,
    ProcessAssets,
    GenerateTexts,
    ReviewTexts,
    GenerateArtwork,
    PersistRecords,
    RenderDocument,
    Publish,
    SkipPublish,
    MirrorLocal,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Succeeded,
    /// Finished, but some items were left out.
    Partial,
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: StageStatus,
    pub detail: String,
}

/// An asset, record or artwork that was dropped from the run.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedItem {
    pub stage: Stage,
    pub item: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverArt {
    pub url: String,
    pub storage_path: String,
    pub extension: String,
}

/// Everything a run has produced so far.
#[derive(Debug)]
pub struct RunState {
    pub request: PublishRequest,
    /// Discovered assets; after `ProcessAssets`, only the uploaded ones.
    pub assets: Vec<AudioAsset>,
    pub candidates: Vec<String>,
    /// Finalized (rated) texts.
    pub texts: Vec<GeneratedText>,
    pub daily_id: Option<i64>,
    pub cover_art: Option<CoverArt>,
    pub backup: Option<PathBuf>,
    pub document: Option<PathBuf>,
    pub published: bool,
    pub log: Vec<StageOutcome>,
    pub skipped: Vec<SkippedItem>,
    pub mirror_failures: Vec<MirrorError>,
}

impl RunState {
    pub fn new(request: PublishRequest) -> Self {
        Self {
            request,
            assets: Vec::new(),
            candidates: Vec::new(),
            texts: Vec::new(),
            daily_id: None,
            cover_art: None,
            backup: None,
            document: None,
            published: false,
            log: Vec::new(),
            skipped: Vec::new(),
            mirror_failures: Vec::new(),
        }
    }

    fn record(&mut self, stage: Stage, status: StageStatus, detail: impl Into<String>) {
        let detail = detail.into();
        info!(stage = %stage, status = ?status, detail = %detail, "[PUBLISH] Stage finished");
        self.log.push(StageOutcome {
            stage,
            status,
            detail,
        });
    }

    fn skip(&mut self, stage: Stage, item: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedItem {
            stage,
            item: item.into(),
            reason: reason.into(),
        });
    }

    fn skipped_in(&self, stage: Stage) -> usize {
        self.skipped.iter().filter(|s| s.stage == stage).count()
    }

    pub fn uploaded_assets(&self) -> impl Iterator<Item = &AudioAsset> {
        self.assets.iter().filter(|a| a.remote_url.is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    CompletedWithSkips,
    Aborted,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Completed => "completed",
            Outcome::CompletedWithSkips => "completed with skipped items",
            Outcome::Aborted => "aborted",
        })
    }
}

/// Result of a run that reached `Done`.
#[derive(Debug)]
pub struct PublishReport {
    pub state: RunState,
}

impl PublishReport {
    pub fn outcome(&self) -> Outcome {
        if self.state.skipped.is_empty() {
            Outcome::Completed
        } else {
            Outcome::CompletedWithSkips
        }
    }

    /// Human-readable summary naming every skipped item.
    pub fn summary(&self) -> String {
        let s = &self.state;
        let mut out = format!(
            "Publish of {} {}.\n  daily id: {}\n  audio uploaded: {}\n  texts finalized: {}\n  published: {}\n",
            s.request.name,
            self.outcome(),
            s.daily_id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
            s.uploaded_assets().count(),
            s.texts.len(),
            if s.published { "yes" } else { "no" },
        );
        if let Some(doc) = &s.document {
            out.push_str(&format!("  document: {}\n", doc.display()));
        }
        for item in &s.skipped {
            out.push_str(&format!("  skipped [{}] {}: {}\n", item.stage, item.item, item.reason));
        }
        for failure in &s.mirror_failures {
            out.push_str(&format!("  mirror: {failure}\n"));
        }
        out
    }
}

/// Map a finished run to its outcome, including the aborted case.
pub fn outcome_of(result: &Result<PublishReport, PublishError>) -> Outcome {
    match result {
        Ok(report) => report.outcome(),
        Err(_) => Outcome::Aborted,
    }
}

/// Run every stage for one bundle.
pub async fn publish<R: Rng + ?Sized>(
    config: &PublishConfig,
    services: Services<'_>,
    args: PublishArgs,
    rng: &mut R,
) -> Result<PublishReport, PublishError> {
    info!(name = %args.name, "[PUBLISH] Starting publish pipeline");

    let state = validate(args).map_err(|e| fatal(Stage::Validate, e))?;
    let state = init_branch(state, services.vcs)
        .await
        .map_err(|e| fatal(Stage::InitBranch, e))?;
    let stamp = Local::now().format("%Y%m%d%H%M%S").to_string();
    let state = discover_assets(state, &config.paths, &stamp)
        .map_err(|e| fatal(Stage::DiscoverAssets, e))?;
    let state = process_assets(state, services)
        .await
        .map_err(|e| fatal(Stage::ProcessAssets, e))?;

    let chain = load_chain(&config.paths.corpus).map_err(|e| fatal(Stage::GenerateTexts, e))?;
    let state = generate_texts(state, &chain, &mut *rng, &config.generation);
    let state = review_texts(state, services.prompt, &chain, &mut *rng, config.generation.max_words)
        .await
        .map_err(|e| fatal(Stage::ReviewTexts, e))?;

    let state = generate_artwork(state, services.artwork, services.store).await;
    let state = persist_records(state, services.store)
        .await
        .map_err(|e| fatal(Stage::PersistRecords, e))?;
    let state = render_document(state, &config.paths).map_err(|e| fatal(Stage::RenderDocument, e))?;
    let state = publish_or_skip(state, services.vcs, &config.publish)
        .await
        .map_err(|e| fatal(Stage::Publish, e))?;
    let mut state = mirror_local(state, services.store, &config.paths).await;

    state.record(Stage::Done, StageStatus::Succeeded, "run finished");
    let report = PublishReport { state };
    info!(outcome = %report.outcome(), "[PUBLISH] Pipeline finished");
    Ok(report)
}

fn fatal(stage: Stage, e: PublishError) -> PublishError {
    error!(stage = %stage, error = %e, "[PUBLISH][ERROR] Aborting run");
    e
}

pub fn validate(args: PublishArgs) -> Result<RunState, PublishError> {
    let request = PublishRequest::new(args.name, args.description, args.today)?;
    let mut state = RunState::new(request);
    let detail = format!("name {} dated {}", state.request.name, state.request.date);
    state.record(Stage::Validate, StageStatus::Succeeded, detail);
    Ok(state)
}

pub async fn init_branch(
    mut state: RunState,
    vcs: &dyn VersionControl,
) -> Result<RunState, PublishError> {
    vcs.checkout_or_create_branch(&state.request.name)
        .await
        .map_err(|e| PublishError::ExternalTool {
            stage: "init-branch",
            message: e.to_string(),
        })?;
    let detail = format!("on branch {}", state.request.name);
    state.record(Stage::InitBranch, StageStatus::Succeeded, detail);
    Ok(state)
}

pub fn discover_assets(
    mut state: RunState,
    paths: &PathsConfig,
    stamp: &str,
) -> Result<RunState, PublishError> {
    let found = discover::discover_assets(paths, &state.request.name, stamp)?;
    let detail = match &found.source {
        AssetSource::Directory(dir) => format!("{} asset(s) in {}", found.assets.len(), dir.display()),
        AssetSource::SingleFile(file) => format!("single asset {}", file.display()),
        AssetSource::Nothing => "no assets, text-only run".to_string(),
    };
    state.assets = found.assets;
    state.backup = found.backup;
    state.record(Stage::DiscoverAssets, StageStatus::Succeeded, detail);
    Ok(state)
}

/// Duration, upload and rating for each asset in turn. An asset that fails to
/// read or upload is dropped; the others carry on.
pub async fn process_assets(
    mut state: RunState,
    services: Services<'_>,
) -> Result<RunState, PublishError> {
    let discovered = std::mem::take(&mut state.assets);
    let total = discovered.len();
    let mut kept = Vec::with_capacity(total);

    for mut asset in discovered {
        info!(file = %asset.file_name, "[PUBLISH][ASSET] Processing asset");
        if let Err(e) = process_one(&mut asset, services.store).await {
            error!(file = %asset.file_name, error = %e, "[PUBLISH][ASSET][ERROR] Asset excluded from run");
            state.skip(Stage::ProcessAssets, asset.file_name.clone(), e.to_string());
            continue;
        }
        let rating = review::review_audio(
            services.prompt,
            services.player,
            &asset.file_name,
            &asset.local_path,
        )
        .await?;
        asset.coherency_level = Some(rating);
        kept.push(asset);
    }

    state.assets = kept;
    let status = if state.assets.len() == total {
        StageStatus::Succeeded
    } else {
        StageStatus::Partial
    };
    let detail = format!("{} of {} asset(s) uploaded", state.assets.len(), total);
    state.record(Stage::ProcessAssets, status, detail);
    Ok(state)
}

async fn process_one(asset: &mut AudioAsset, store: &dyn RemoteStore) -> Result<(), AssetError> {
    let bytes = tokio::fs::read(&asset.local_path)
        .await
        .map_err(|source| AssetError::Read {
            file: asset.file_name.clone(),
            source,
        })?;

    match duration::parse(&bytes) {
        ParsedDuration::Known { seconds } => {
            debug!(file = %asset.file_name, seconds, "[PUBLISH][ASSET] Parsed duration");
            asset.duration = Some(seconds);
        }
        ParsedDuration::Unknown(reason) => {
            warn!(file = %asset.file_name, reason = %reason, "[PUBLISH][ASSET] Duration unknown");
            asset.duration = None;
        }
    }

    let url = store
        .upload_blob(&asset.storage_path, &bytes, &asset.content_type)
        .await
        .map_err(|e| AssetError::Upload {
            file: asset.file_name.clone(),
            message: e.to_string(),
        })?;
    info!(file = %asset.file_name, url = %url, "[PUBLISH][ASSET] Uploaded asset");
    asset.remote_url = Some(url);
    Ok(())
}

pub fn load_chain(corpus: &Path) -> Result<MarkovChain, PublishError> {
    let raw = std::fs::read_to_string(corpus).map_err(|source| PublishError::Corpus {
        path: corpus.to_path_buf(),
        source,
    })?;
    let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
    info!(path = %corpus.display(), lines = lines.len(), "[PUBLISH][TEXT] Built chain from corpus");
    Ok(MarkovChain::build(&lines))
}

pub fn generate_texts<R: Rng + ?Sized>(
    mut state: RunState,
    chain: &MarkovChain,
    rng: &mut R,
    generation: &GenerationConfig,
) -> RunState {
    state.candidates = (0..generation.text_count)
        .map(|_| chain.generate(&mut *rng, generation.max_words))
        .collect();
    let detail = format!("{} candidate(s)", state.candidates.len());
    state.record(Stage::GenerateTexts, StageStatus::Succeeded, detail);
    state
}

pub async fn review_texts<R: Rng + ?Sized>(
    mut state: RunState,
    prompt: &dyn Prompt,
    chain: &MarkovChain,
    rng: &mut R,
    max_words: usize,
) -> Result<RunState, PublishError> {
    let candidates = std::mem::take(&mut state.candidates);
    let total = candidates.len();
    for (i, candidate) in candidates.into_iter().enumerate() {
        let label = format!("text {}/{}", i + 1, total);
        match review::review_text(prompt, chain, &mut *rng, &label, candidate, max_words).await? {
            Some(text) => state.texts.push(text),
            None => state.skip(Stage::ReviewTexts, label, "skipped by reviewer"),
        }
    }
    let status = if state.texts.len() == total {
        StageStatus::Succeeded
    } else {
        StageStatus::Partial
    };
    let detail = format!("{} of {} text(s) finalized", state.texts.len(), total);
    state.record(Stage::ReviewTexts, status, detail);
    Ok(state)
}

/// Make and upload the cover. Failure leaves the document without one.
pub async fn generate_artwork(
    mut state: RunState,
    artwork: &dyn ArtworkGenerator,
    store: &dyn RemoteStore,
) -> RunState {
    let name = state.request.name.clone();
    let result = async {
        let art = artwork.generate(&name).await.map_err(|e| e.to_string())?;
        let storage_path = format!("covers/{}.{}", sanitize_name(&name), art.extension);
        let url = store
            .upload_blob(&storage_path, &art.bytes, &art.content_type)
            .await
            .map_err(|e| e.to_string())?;
        Ok::<_, String>(CoverArt {
            url,
            storage_path,
            extension: art.extension,
        })
    }
    .await;

    match result {
        Ok(cover) => {
            let detail = format!("cover at {}", cover.url);
            state.cover_art = Some(cover);
            state.record(Stage::GenerateArtwork, StageStatus::Succeeded, detail);
        }
        Err(reason) => {
            error!(error = %reason, "[PUBLISH][ARTWORK][ERROR] Cover art unavailable");
            state.skip(Stage::GenerateArtwork, "cover art", reason.clone());
            state.record(Stage::GenerateArtwork, StageStatus::Skipped, reason);
        }
    }
    state
}

/// Daily record first; its id keys one record per uploaded asset and per text.
pub async fn persist_records(
    mut state: RunState,
    store: &dyn RemoteStore,
) -> Result<RunState, PublishError> {
    let daily = DailyRecord {
        name: state.request.name.clone(),
        date: state.request.date,
        description: state.request.description.clone(),
        cover_art_url: state.cover_art.as_ref().map(|c| c.url.clone()),
    };
    let daily_id = store.insert_daily(&daily).await.map_err(|e| {
        error!(error = %e, record = "daily", "[PUBLISH][RECORD][ERROR] Daily record insert failed");
        PublishError::TopLevelRecord(e.to_string())
    })?;
    info!(daily_id, "[PUBLISH][RECORD] Inserted daily record");
    state.daily_id = Some(daily_id);

    let failures = persist_dependents(daily_id, &state.assets, &state.texts, store).await;
    let written = state.uploaded_assets().count() + state.texts.len() - failures.len();
    for failure in failures {
        state.skip(Stage::PersistRecords, failure.record.clone(), failure.message);
    }
    let status = if state.skipped_in(Stage::PersistRecords) == 0 {
        StageStatus::Succeeded
    } else {
        StageStatus::Partial
    };
    state.record(
        Stage::PersistRecords,
        status,
        format!("daily id {daily_id}, {written} dependent record(s)"),
    );
    Ok(state)
}

async fn persist_dependents(
    daily_id: i64,
    assets: &[AudioAsset],
    texts: &[GeneratedText],
    store: &dyn RemoteStore,
) -> Vec<RecordError> {
    let mut failures = Vec::new();

    for asset in assets {
        let Some(url) = asset.remote_url.clone() else {
            continue;
        };
        let record = AudioRecord {
            daily_id,
            file_name: asset.file_name.clone(),
            url,
            duration_seconds: asset.duration,
            size_bytes: asset.size_bytes,
            coherency_level: asset.coherency_level,
        };
        match store.insert_audio(&record).await {
            Ok(()) => debug!(file = %asset.file_name, "[PUBLISH][RECORD] Inserted audio record"),
            Err(e) => {
                error!(file = %asset.file_name, error = %e, "[PUBLISH][RECORD][ERROR] Audio record insert failed");
                failures.push(RecordError {
                    record: format!("audio record {}", asset.file_name),
                    message: e.to_string(),
                });
            }
        }
    }

    for (i, text) in texts.iter().enumerate() {
        let record = TextRecord {
            daily_id,
            content: text.content.clone(),
            coherency_level: text.coherency_level,
            length: text.length,
        };
        match store.insert_text(&record).await {
            Ok(()) => debug!(index = i + 1, "[PUBLISH][RECORD] Inserted text record"),
            Err(e) => {
                error!(index = i + 1, error = %e, "[PUBLISH][RECORD][ERROR] Text record insert failed");
                failures.push(RecordError {
                    record: format!("text record {}", i + 1),
                    message: e.to_string(),
                });
            }
        }
    }
    failures
}

pub fn render_document(mut state: RunState, paths: &PathsConfig) -> Result<RunState, PublishError> {
    let out = render::write_document(
        &paths.template,
        &paths.content_dir,
        &DocumentInputs {
            request: &state.request,
            assets: &state.assets,
            texts: &state.texts,
            cover_art_url: state.cover_art.as_ref().map(|c| c.url.as_str()),
            daily_id: state.daily_id,
        },
    )?;
    let detail = format!("wrote {}", out.display());
    state.document = Some(out);
    state.record(Stage::RenderDocument, StageStatus::Succeeded, detail);
    Ok(state)
}

/// Commit and push, but only when the document references stored audio.
pub async fn publish_or_skip(
    mut state: RunState,
    vcs: &dyn VersionControl,
    git: &GitConfig,
) -> Result<RunState, PublishError> {
    if state.uploaded_assets().next().is_none() {
        warn!(name = %state.request.name, "[PUBLISH][GIT] No audio uploaded this run, not publishing");
        state.record(
            Stage::SkipPublish,
            StageStatus::Skipped,
            "no asset was uploaded this run",
        );
        return Ok(state);
    }

    let message = git.commit_message(&state.request.name);
    let tool_error = |e: crate::error::VcsError| PublishError::ExternalTool {
        stage: "publish",
        message: e.to_string(),
    };
    vcs.commit_all(&message).await.map_err(tool_error)?;
    vcs.push(&state.request.name).await.map_err(tool_error)?;
    state.published = true;
    let detail = format!("committed and pushed {}", state.request.name);
    state.record(Stage::Publish, StageStatus::Succeeded, detail);
    Ok(state)
}

/// Copy the run's output into the local cache. Failures are reported, never raised.
pub async fn mirror_local(
    mut state: RunState,
    store: &dyn RemoteStore,
    paths: &PathsConfig,
) -> RunState {
    let mut failures: Vec<MirrorError> = Vec::new();
    let mut mirrored = 0usize;

    for result in mirror::mirror_audio(
        store,
        &paths.audio_cache_dir,
        &state.request.name,
        &state.assets,
    )
    .await
    {
        match result {
            Ok(_) => mirrored += 1,
            Err(e) => failures.push(e),
        }
    }

    if !state.texts.is_empty() {
        match mirror::append_texts(
            &paths.texts_cache,
            &state.request.name,
            state.daily_id,
            &state.texts,
        ) {
            Ok(ids) => mirrored += ids.len(),
            Err(e) => failures.push(e),
        }
    }

    if let Some(cover) = &state.cover_art {
        match mirror::mirror_cover(
            store,
            &paths.artwork_cache_dir,
            &sanitize_name(&state.request.name),
            &cover.storage_path,
            &cover.extension,
        )
        .await
        {
            Ok(_) => mirrored += 1,
            Err(e) => failures.push(e),
        }
    }

    for failure in &failures {
        error!(
            target_item = %failure.target,
            error = %failure.message,
            hint = %failure.hint,
            "[PUBLISH][MIRROR][ERROR] Local mirror step failed, retry manually"
        );
    }
    let status = if failures.is_empty() {
        StageStatus::Succeeded
    } else {
        StageStatus::Partial
    };
    let detail = format!("{mirrored} item(s) mirrored, {} failure(s)", failures.len());
    state.mirror_failures = failures;
    state.record(Stage::MirrorLocal, status, detail);
    state
}
