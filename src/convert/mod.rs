mod animation;
mod geometry;
mod graph;
mod material;
mod morph;
mod skinning;
mod transform;
mod types;
mod units;
mod validation;

use std::collections::HashMap;

use crate::error::ImportError;
use crate::host::HostEnvironment;
use crate::settings::ImportSettings;
use crate::source::{AnimLayer, DocumentInfo, SourceMaterialId, SourceNodeId, SourceScene};
use crate::target::{MaterialId, NodeId, SceneInfo, TargetDocument, Tick, TimeRange};

// Re-export public types for callers of this module.
pub use types::{ImportReport, Severity, ValidationIssue};
pub use units::{normalize_weights, seconds_to_ticks};
pub use validation::{AcceptDefaults, OptionsPrompt, OptionsRequest, PromptOutcome};

use types::{PendingSkinBinding, WorkTree};
use validation::{negotiate_options, select_take};

// ─── Public API ───────────────────────────────────────────────────────────────

/// Transcodes `source` into `target`.
///
/// The import runs in three passes: the node graph (with geometry, materials
/// and morphs), then deferred skin bindings, then rest transforms and
/// animation. Options are negotiated first; a cancelled prompt returns
/// [`ImportError::Cancelled`] before the target is touched.
///
/// # Arguments
///
/// * `source` - Parsed interchange document.
/// * `target` - Document receiving the imported nodes.
/// * `host` - Texture lookup and application capabilities.
/// * `settings` - Requested import options.
/// * `prompt` - Confirms options when there is a take to choose or something
///   to report.
///
/// # Returns
///
/// A report listing created nodes, counts and diagnostics.
pub fn import_scene(
    source: &SourceScene,
    target: &mut dyn TargetDocument,
    host: &dyn HostEnvironment,
    settings: &ImportSettings,
    prompt: &mut dyn OptionsPrompt,
) -> Result<ImportReport, ImportError> {
    source.validate()?;

    let (settings, issues) = negotiate_options(source, host, settings, prompt)?;
    log::info!(
        "importing {} node(s), {} material(s), {} take(s)",
        source.nodes.len().saturating_sub(1),
        source.materials.len(),
        source.anim_stacks.len()
    );

    let mut importer = Importer::new(source, target, host, settings);
    importer.report.issues = issues;
    importer.run();
    Ok(importer.finish())
}

// ─── Importer state ───────────────────────────────────────────────────────────

/// Mutable state shared by the import passes.
struct Importer<'a> {
    source: &'a SourceScene,
    target: &'a mut dyn TargetDocument,
    host: &'a dyn HostEnvironment,
    settings: ImportSettings,
    tree: WorkTree,
    /// Target node created for each source node by the graph pass.
    node_map: HashMap<SourceNodeId, NodeId>,
    /// Skeleton copies, keyed by the figure they were copied under.
    replicas: HashMap<(NodeId, SourceNodeId), NodeId>,
    pending: Vec<PendingSkinBinding<'a>>,
    materials: HashMap<SourceMaterialId, MaterialId>,
    default_material: Option<MaterialId>,
    created_materials: Vec<MaterialId>,
    layer: Option<&'a AnimLayer>,
    end_tick: Tick,
    /// Figure receiving a skeleton copy; meshes are not copied.
    replicating: Option<NodeId>,
    report: ImportReport,
}

impl<'a> Importer<'a> {
    fn new(
        source: &'a SourceScene,
        target: &'a mut dyn TargetDocument,
        host: &'a dyn HostEnvironment,
        settings: ImportSettings,
    ) -> Self {
        Self {
            source,
            target,
            host,
            settings,
            tree: WorkTree::new(source.root()),
            node_map: HashMap::new(),
            replicas: HashMap::new(),
            pending: Vec::new(),
            materials: HashMap::new(),
            default_material: None,
            created_materials: Vec::new(),
            layer: None,
            end_tick: 0,
            replicating: None,
            report: ImportReport {
                document: source.metadata.clone(),
                ..ImportReport::default()
            },
        }
    }

    fn run(&mut self) {
        self.choose_take();

        self.walk_graph(WorkTree::ROOT);
        self.bind_skins();
        self.apply_rest_and_animation();

        self.extend_time_ranges();
        self.fix_all_transparent_materials();
        self.target.set_scene_info(scene_info(&self.source.metadata));
    }

    fn choose_take(&mut self) {
        let source = self.source;
        match select_take(&source.anim_stacks, &self.settings) {
            Some(selected) => {
                log::info!("using take '{}'", selected.stack.name);
                self.report.take = Some(selected.stack.name.clone());
                self.layer = selected.layer;
            }
            None => {
                if let Some(take) = self.settings.take.clone()
                    && self.settings.import_animation
                {
                    self.warn(
                        "TAKE_NOT_FOUND",
                        format!("Take '{take}' not found, animation is not imported"),
                    );
                }
            }
        }
    }

    fn extend_time_ranges(&mut self) {
        let current = self.target.anim_range();
        let range = TimeRange {
            start: current.start,
            end: current.end.max(self.end_tick),
        };
        self.target.set_anim_range(range);
        self.target.set_play_range(range);
    }

    /// Records a warning and logs it.
    fn warn(&mut self, code: &str, message: impl Into<String>) {
        let issue = ValidationIssue::new(Severity::Warning, code, message);
        log::warn!("[{}] {}", issue.code, issue.message);
        self.report.issues.push(issue);
    }

    fn error(&mut self, code: &str, message: impl Into<String>) {
        let issue = ValidationIssue::new(Severity::Error, code, message);
        log::error!("[{}] {}", issue.code, issue.message);
        self.report.issues.push(issue);
    }

    fn finish(mut self) -> ImportReport {
        self.report.material_count = self.created_materials.len();
        self.report.end_tick = self.end_tick;
        log::info!(
            "imported {} node(s): {} figure(s), {} bone(s), {} mesh(es), {} morph(s)",
            self.report.imported_nodes.len(),
            self.report.figure_count,
            self.report.bone_count,
            self.report.mesh_count,
            self.report.morph_count
        );
        self.report
    }
}

fn scene_info(info: &DocumentInfo) -> SceneInfo {
    let source_application = match (&info.application_name, &info.application_version) {
        (Some(name), Some(version)) => Some(format!("{name} {version}")),
        (Some(name), None) => Some(name.clone()),
        (None, _) => info.application_vendor.clone(),
    };

    SceneInfo {
        author: info.author.clone(),
        title: info.title.clone(),
        subject: info.subject.clone(),
        keywords: info.keywords.clone(),
        revision: info.revision.clone(),
        comment: info.comment.clone(),
        source_application,
        source_file_version: info.file_version,
        source_is_binary: info.is_binary,
    }
}
