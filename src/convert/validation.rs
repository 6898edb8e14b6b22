use crate::error::ImportError;
use crate::host::HostEnvironment;
use crate::settings::ImportSettings;
use crate::source::{AnimLayer, AnimStack, DocumentInfo, SkeletonType, SourceNodeId, SourceScene};

use super::types::{Severity, ValidationIssue};

const UNIFORM_SCALE_TOLERANCE: f64 = 1e-10;

// ─── Rig pre-scan ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct RigFindings {
    pre_post_mismatch: Vec<String>,
    non_uniform_scale: Vec<String>,
    cluster_not_bone: Vec<String>,
    bone_without_root: Vec<String>,
}

/// Walks the document below the root and reports rigging constructs that
/// import with reduced fidelity. One issue per kind of problem.
pub(super) fn prescan_rig(scene: &SourceScene) -> Vec<ValidationIssue> {
    let mut findings = RigFindings::default();
    for &child in &scene.node(scene.root()).children {
        prescan_node(scene, child, &mut findings);
    }

    let mut issues = Vec::new();
    let mut push = |names: Vec<String>, code: &str, message: &str| {
        if let Some(first) = names.first() {
            issues.push(ValidationIssue::new(
                Severity::Warning,
                code,
                format!("{message} ({} node(s), first: '{first}')", names.len()),
            ));
        }
    };

    push(
        findings.bone_without_root,
        "RIG_BONE_WITHOUT_ROOT",
        "Rigging limitation: bones without root skeleton",
    );
    push(
        findings.cluster_not_bone,
        "RIG_CLUSTER_LINK_NOT_BONE",
        "Rigging limitation: cluster links reference non bone",
    );
    push(
        findings.pre_post_mismatch,
        "RIG_PRE_POST_ROTATION_MISMATCH",
        "Rigging limitation: pre and post rotation must match",
    );
    push(
        findings.non_uniform_scale,
        "RIG_NON_UNIFORM_SCALE",
        "Transform differences: non uniform scale detected, results will likely differ",
    );

    issues
}

fn prescan_node(scene: &SourceScene, id: SourceNodeId, findings: &mut RigFindings) {
    let node = scene.node(id);

    if node.pre_rotation != node.post_rotation {
        findings.pre_post_mismatch.push(node.name.clone());
    }

    if !is_uniform(node.scaling.x, node.scaling.y, node.scaling.z) {
        findings.non_uniform_scale.push(node.name.clone());
    }

    if let Some(mesh) = node.mesh_data() {
        for cluster in mesh.skins().flat_map(|skin| skin.clusters.iter()) {
            if scene.get(cluster.link).is_none_or(|link| !link.is_skeleton()) {
                findings.cluster_not_bone.push(node.name.clone());
            }
        }
    }

    if let Some(skeleton_type) = node.skeleton_type()
        && skeleton_type != SkeletonType::Root
    {
        let parent_is_skeleton = node
            .parent
            .is_some_and(|parent| scene.node(parent).is_skeleton());
        if !parent_is_skeleton {
            findings.bone_without_root.push(node.name.clone());
        }
    }

    for &child in &node.children {
        prescan_node(scene, child, findings);
    }
}

fn is_uniform(a: f64, b: f64, c: f64) -> bool {
    (a - b).abs() <= UNIFORM_SCALE_TOLERANCE && (a - c).abs() <= UNIFORM_SCALE_TOLERANCE
}

/// Reports stacks that cannot be imported as-is.
pub(super) fn animation_stack_issues(stacks: &[AnimStack]) -> Vec<ValidationIssue> {
    stacks
        .iter()
        .filter_map(|stack| match stack.layers.len() {
            0 => Some(ValidationIssue::new(
                Severity::Warning,
                "ANIM_STACK_WITHOUT_LAYERS",
                format!("Unexpected: '{}' has no layers", stack.name),
            )),
            1 => None,
            count => Some(ValidationIssue::new(
                Severity::Warning,
                "ANIM_STACK_MULTIPLE_LAYERS",
                format!(
                    "Animation limitation: '{}' has {count} layers, only the first is imported",
                    stack.name
                ),
            )),
        })
        .collect()
}

/// Rig warnings are not shown when the document was written by the same
/// vendor as the importing application.
pub(super) fn rig_issues_suppressed(host: &dyn HostEnvironment, info: &DocumentInfo) -> bool {
    match (host.vendor(), info.application_vendor.as_deref()) {
        (Some(host_vendor), Some(document_vendor)) => {
            !host_vendor.is_empty() && host_vendor.eq_ignore_ascii_case(document_vendor)
        }
        _ => false,
    }
}

// ─── Options negotiation ──────────────────────────────────────────────────────

/// What the options prompt is shown.
#[derive(Debug, Clone)]
pub struct OptionsRequest<'a> {
    /// Animation stacks as `"<n>: <name>"`, numbered from 1.
    pub take_choices: Vec<String>,
    pub issues: &'a [ValidationIssue],
    pub settings: ImportSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptOutcome {
    Accepted(ImportSettings),
    Cancelled,
}

/// Interactive confirmation of import options.
pub trait OptionsPrompt {
    fn confirm(&mut self, request: &OptionsRequest<'_>) -> PromptOutcome;
}

/// Accepts the offered settings without interaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptDefaults;

impl OptionsPrompt for AcceptDefaults {
    fn confirm(&mut self, request: &OptionsRequest<'_>) -> PromptOutcome {
        PromptOutcome::Accepted(request.settings.clone())
    }
}

pub(super) fn take_choices(stacks: &[AnimStack]) -> Vec<String> {
    stacks
        .iter()
        .enumerate()
        .map(|(index, stack)| format!("{}: {}", index + 1, stack.name))
        .collect()
}

/// Gathers diagnostics and, unless running silently, lets the prompt confirm
/// or change the settings. The prompt is consulted only when there is a take
/// to choose or something to report.
pub(super) fn negotiate_options(
    scene: &SourceScene,
    host: &dyn HostEnvironment,
    settings: &ImportSettings,
    prompt: &mut dyn OptionsPrompt,
) -> Result<(ImportSettings, Vec<ValidationIssue>), ImportError> {
    let mut issues = Vec::new();
    if rig_issues_suppressed(host, &scene.metadata) {
        log::debug!("rig diagnostics suppressed for same-vendor document");
    } else {
        issues.extend(prescan_rig(scene));
    }
    issues.extend(animation_stack_issues(&scene.anim_stacks));

    for issue in &issues {
        log::warn!("[{}] {}", issue.code, issue.message);
    }

    if settings.run_silent {
        return Ok((settings.clone(), issues));
    }

    if scene.anim_stacks.len() <= 1 && issues.is_empty() {
        return Ok((settings.clone(), issues));
    }

    let request = OptionsRequest {
        take_choices: take_choices(&scene.anim_stacks),
        issues: &issues,
        settings: settings.clone(),
    };
    match prompt.confirm(&request) {
        PromptOutcome::Accepted(accepted) => Ok((accepted, issues)),
        PromptOutcome::Cancelled => Err(ImportError::Cancelled),
    }
}

// ─── Take selection ───────────────────────────────────────────────────────────

/// The animation layer chosen for import.
pub(super) struct SelectedTake<'a> {
    pub stack: &'a AnimStack,
    pub layer: Option<&'a AnimLayer>,
}

/// Picks the stack named by `settings.take`: an exact name first, then a
/// 1-based position prefix such as `"2"` or `"2: Run"`. No take picks the
/// first stack. Only the first layer of a stack is used.
pub(super) fn select_take<'a>(
    stacks: &'a [AnimStack],
    settings: &ImportSettings,
) -> Option<SelectedTake<'a>> {
    if !settings.import_animation {
        return None;
    }

    let stack = match settings.take.as_deref().map(str::trim) {
        None | Some("") => stacks.first()?,
        Some(take) => stacks
            .iter()
            .find(|stack| stack.name == take)
            .or_else(|| take_position(take).and_then(|index| stacks.get(index)))?,
    };

    Some(SelectedTake {
        stack,
        layer: stack.layers.first(),
    })
}

fn take_position(take: &str) -> Option<usize> {
    let prefix = take.split(':').next()?.trim();
    let position: usize = prefix.parse().ok()?;
    position.checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::FileSystemHost;
    use crate::source::{SourceCluster, SourceDeformer, SourceMesh, SourceNode, SourceSkin};
    use nalgebra::Vector3;

    fn stack(name: &str, layers: usize) -> AnimStack {
        AnimStack {
            name: name.to_string(),
            layers: (0..layers)
                .map(|index| AnimLayer {
                    name: format!("{name}_layer{index}"),
                    ..AnimLayer::default()
                })
                .collect(),
        }
    }

    struct RecordingPrompt {
        calls: usize,
        outcome: PromptOutcome,
    }

    impl OptionsPrompt for RecordingPrompt {
        fn confirm(&mut self, _request: &OptionsRequest<'_>) -> PromptOutcome {
            self.calls += 1;
            self.outcome.clone()
        }
    }

    fn rigged_scene() -> SourceScene {
        let mut scene = SourceScene::new();
        let mut group = SourceNode::group("Stretched");
        group.scaling = Vector3::new(1.0, 2.0, 1.0);
        let group = scene.add_node(scene.root(), group);
        scene.add_node(group, SourceNode::skeleton("Orphan", SkeletonType::LimbNode));
        let mut mesh = SourceMesh::default();
        mesh.deformers.push(SourceDeformer::Skin(SourceSkin {
            clusters: vec![SourceCluster {
                link: group,
                ..SourceCluster::default()
            }],
            ..SourceSkin::default()
        }));
        scene.add_node(scene.root(), SourceNode::mesh("Body", mesh));
        scene
    }

    #[test]
    fn given_rig_problems_when_prescanning_then_each_kind_is_reported_once() {
        let issues = prescan_rig(&rigged_scene());
        let codes: Vec<_> = issues.iter().map(|issue| issue.code.as_str()).collect();

        assert_eq!(
            codes,
            vec![
                "RIG_BONE_WITHOUT_ROOT",
                "RIG_CLUSTER_LINK_NOT_BONE",
                "RIG_NON_UNIFORM_SCALE"
            ]
        );
        assert!(issues[0].message.contains("Orphan"));
    }

    #[test]
    fn given_same_vendor_when_negotiating_then_rig_issues_are_suppressed() {
        let mut scene = rigged_scene();
        scene.metadata.application_vendor = Some("Acme Studios".to_string());
        let host = FileSystemHost::new(None).with_vendor("ACME STUDIOS");
        let mut prompt = RecordingPrompt {
            calls: 0,
            outcome: PromptOutcome::Cancelled,
        };

        let (_, issues) = negotiate_options(&scene, &host, &ImportSettings::default(), &mut prompt)
            .expect("nothing to confirm");

        assert!(issues.is_empty());
        assert_eq!(prompt.calls, 0);
    }

    #[test]
    fn given_warnings_and_cancel_when_negotiating_then_cancelled_error_is_returned() {
        let scene = rigged_scene();
        let host = FileSystemHost::new(None);
        let mut prompt = RecordingPrompt {
            calls: 0,
            outcome: PromptOutcome::Cancelled,
        };

        let result = negotiate_options(&scene, &host, &ImportSettings::default(), &mut prompt);

        assert!(matches!(result, Err(ImportError::Cancelled)));
        assert_eq!(prompt.calls, 1);
    }

    #[test]
    fn given_run_silent_when_negotiating_then_prompt_is_skipped() {
        let mut scene = rigged_scene();
        scene.anim_stacks = vec![stack("Walk", 1), stack("Run", 2)];
        let settings = ImportSettings {
            run_silent: true,
            ..ImportSettings::default()
        };
        let mut prompt = RecordingPrompt {
            calls: 0,
            outcome: PromptOutcome::Cancelled,
        };

        let (accepted, issues) =
            negotiate_options(&scene, &FileSystemHost::new(None), &settings, &mut prompt)
                .expect("silent import");

        assert_eq!(prompt.calls, 0);
        assert_eq!(accepted, settings);
        assert!(issues.iter().any(|i| i.code == "ANIM_STACK_MULTIPLE_LAYERS"));
    }

    #[test]
    fn given_takes_when_selecting_then_name_then_position_prefix_resolve() {
        let stacks = vec![stack("Walk", 1), stack("Run", 2), stack("Empty", 0)];
        let mut settings = ImportSettings::default();

        let first = select_take(&stacks, &settings).expect("first stack");
        assert_eq!(first.stack.name, "Walk");

        settings.take = Some("Run".to_string());
        let by_name = select_take(&stacks, &settings).expect("named stack");
        assert_eq!(by_name.layer.map(|l| l.name.as_str()), Some("Run_layer0"));

        settings.take = Some("3: Empty".to_string());
        let by_position = select_take(&stacks, &settings).expect("positional stack");
        assert_eq!(by_position.stack.name, "Empty");
        assert!(by_position.layer.is_none());

        settings.take = Some("Jump".to_string());
        assert!(select_take(&stacks, &settings).is_none());

        settings.take = None;
        settings.import_animation = false;
        assert!(select_take(&stacks, &settings).is_none());
    }

    #[test]
    fn given_stacks_when_listing_choices_then_positions_start_at_one() {
        let stacks = vec![stack("Walk", 1), stack("Run", 1)];
        assert_eq!(take_choices(&stacks), vec!["1: Walk", "2: Run"]);
    }
}
