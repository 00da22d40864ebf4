use std::io;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use test_log::test;

use super::*;
use crate::actor::broadcast::BroadcastReceiver;
use crate::common::collections::HashSet;
use crate::layout_engine::Frame;
use crate::model::server::SourceData;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Crop { scene: String, source: SourceId, crop: CropValues },
    Switch(String),
    Transition(String, Option<Duration>),
}

#[derive(Default)]
struct FakeCompositor {
    scenes: Vec<SceneData>,
    calls: Mutex<Vec<Call>>,
    /// Number of upcoming crop requests to reject.
    transient_failures: Mutex<u32>,
    broken_sources: HashSet<SourceId>,
}

impl FakeCompositor {
    fn with_galleries(max: usize) -> Self {
        let mut scenes = vec![SceneData {
            name: "blank-black".into(),
            sources: vec![],
        }];
        for count in 1..=max {
            let mut sources: Vec<SourceData> = (0..count)
                .map(|i| SourceData {
                    id: source_id(count, i),
                    name: format!("zoom {i}"),
                    kind: "display_capture".into(),
                    width: 3840,
                    height: 2400,
                })
                .collect();
            sources.push(SourceData {
                id: SourceId::new(count as u64 * 100 + 99),
                name: "logo".into(),
                kind: "image_source".into(),
                width: 512,
                height: 512,
            });
            scenes.push(SceneData { name: format!("z{count}"), sources });
        }
        FakeCompositor { scenes, ..Default::default() }
    }

    fn calls(&self) -> Vec<Call> { self.calls.lock().clone() }

    fn take_calls(&self) -> Vec<Call> { std::mem::take(&mut *self.calls.lock()) }

    fn crops(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| matches!(c, Call::Crop { .. })).collect()
    }

    fn switches(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Switch(scene) => Some(scene),
                _ => None,
            })
            .collect()
    }
}

impl Compositor for FakeCompositor {
    async fn apply_crop(
        &self,
        scene: &str,
        source: SourceId,
        crop: CropValues,
    ) -> Result<(), CompositorError> {
        let rejected = CompositorError::Request {
            request: "apply_crop",
            message: "rejected".into(),
        };
        if self.broken_sources.contains(&source) {
            return Err(rejected);
        }
        {
            let mut failures = self.transient_failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(rejected);
            }
        }
        self.calls.lock().push(Call::Crop { scene: scene.into(), source, crop });
        Ok(())
    }

    async fn switch_scene(&self, scene: &str) -> Result<(), CompositorError> {
        self.calls.lock().push(Call::Switch(scene.into()));
        Ok(())
    }

    async fn set_transition(
        &self,
        name: &str,
        duration: Option<Duration>,
    ) -> Result<(), CompositorError> {
        self.calls.lock().push(Call::Transition(name.into(), duration));
        Ok(())
    }

    async fn list_scenes(&self) -> Result<Vec<SceneData>, CompositorError> {
        Ok(self.scenes.clone())
    }
}

/// Participant list shared with the test; `None` makes reads fail.
#[derive(Clone, Default)]
struct FakeParticipants(Arc<Mutex<Option<Vec<String>>>>);

impl FakeParticipants {
    fn set(&self, names: &[&str]) {
        *self.0.lock() = Some(names.iter().map(|n| n.to_string()).collect());
    }
}

impl ParticipantSource for FakeParticipants {
    async fn read_participants(&self) -> Result<Vec<String>, ParticipantListError> {
        self.0.lock().clone().ok_or_else(|| ParticipantListError::Read {
            path: "participants.txt".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        })
    }
}

#[derive(Clone, Default)]
struct FakeUpstream(Arc<Mutex<Vec<UpstreamRequest>>>);

impl Upstream for FakeUpstream {
    async fn send(
        &self,
        request: UpstreamRequest,
    ) -> Result<(), crate::sys::upstream::UpstreamError> {
        self.0.lock().push(request);
        Ok(())
    }
}

struct Harness {
    reactor: Reactor<FakeCompositor, FakeParticipants, FakeUpstream>,
    compositor: Arc<FakeCompositor>,
    participants: FakeParticipants,
    upstream: FakeUpstream,
    broadcast: BroadcastReceiver,
}

impl Harness {
    fn new(compositor: FakeCompositor) -> Self { Self::with_config(compositor, Config::default()) }

    fn with_config(compositor: FakeCompositor, config: Config) -> Self {
        let compositor = Arc::new(compositor);
        let participants = FakeParticipants::default();
        participants.set(&["alice", "bob", "carol", "dave", "erin", "frank"]);
        let upstream = FakeUpstream::default();
        let (tx, broadcast) = actor::channel();
        let reactor =
            Reactor::new(config, compositor.clone(), participants.clone(), upstream.clone())
                .with_broadcast(tx);
        Harness {
            reactor,
            compositor,
            participants,
            upstream,
            broadcast,
        }
    }

    async fn handle(&mut self, event: Event) { self.reactor.handle_event(event).await }

    fn broadcasts(&mut self) -> Vec<BroadcastEvent> {
        let mut events = vec![];
        while let Ok((_, event)) = self.broadcast.try_recv() {
            events.push(event);
        }
        events
    }
}

fn source_id(count: usize, slot: usize) -> SourceId { SourceId::new((count * 100 + slot) as u64) }

fn gallery_crops(count: usize) -> Vec<CropValues> {
    CropCalculator::default().calculate(Frame::new(3840, 2400), count).unwrap()
}

fn crop_call(count: usize, slot: usize, crop: CropValues) -> Call {
    Call::Crop {
        scene: format!("z{count}"),
        source: source_id(count, slot),
        crop,
    }
}

fn names(names: &[&str]) -> Vec<String> { names.iter().map(|n| n.to_string()).collect() }

#[test(tokio::test(start_paused = true))]
async fn count_change_reconciles_then_fades_to_new_scene() {
    let mut h = Harness::new(FakeCompositor::with_galleries(6));
    h.handle(Event::AssignOrder(names(&["alice", "bob", "carol", "dave", "erin"]))).await;
    h.handle(Event::OrderChanged(vec![0, 1, 2, 3])).await;
    h.reactor.settle().await;
    h.compositor.take_calls();

    h.handle(Event::OrderChanged(vec![0, 1, 2, 3, 4])).await;
    h.reactor.settle().await;

    let crops = gallery_crops(5);
    let mut expected: Vec<Call> = (0..5).map(|i| crop_call(5, i, crops[i])).collect();
    expected.extend([
        Call::Transition("Fade".into(), Some(Duration::from_millis(500))),
        Call::Switch("blank-black".into()),
        Call::Transition("Fade".into(), Some(Duration::from_millis(1000))),
        Call::Switch("z5".into()),
    ]);
    assert_eq!(h.compositor.calls(), expected);
    assert_eq!(h.reactor.session().count.current(), 5);
}

#[test(tokio::test(start_paused = true))]
async fn reorder_without_count_change_only_moves_tiles() {
    let mut h = Harness::new(FakeCompositor::with_galleries(4));
    h.handle(Event::AssignOrder(names(&["alice", "bob", "carol", "dave"]))).await;
    h.handle(Event::OrderChanged(vec![0, 1, 2, 3])).await;
    h.reactor.settle().await;
    h.compositor.take_calls();

    // upstream swapped alice and bob; slots keep showing the assigned order
    h.handle(Event::OrderChanged(vec![1, 0, 2, 3])).await;
    h.reactor.settle().await;

    let crops = gallery_crops(4);
    assert_eq!(h.compositor.calls(), vec![crop_call(4, 0, crops[1]), crop_call(4, 1, crops[0])]);
    assert!(!h.reactor.transitions.is_running());
}

#[test(tokio::test(start_paused = true))]
async fn assignment_change_reorders_current_scene() {
    let mut h = Harness::new(FakeCompositor::with_galleries(3));
    h.handle(Event::OrderChanged(vec![0, 1, 2])).await;
    h.reactor.settle().await;
    h.compositor.take_calls();

    h.handle(Event::AssignOrder(names(&["carol", "alice", "bob"]))).await;

    let crops = gallery_crops(3);
    assert_eq!(h.compositor.calls(), vec![
        crop_call(3, 0, crops[2]),
        crop_call(3, 1, crops[0]),
        crop_call(3, 2, crops[1]),
    ]);
}

#[test(tokio::test(start_paused = true))]
async fn short_assigned_order_keeps_tiles_but_still_transitions() {
    let mut h = Harness::new(FakeCompositor::with_galleries(3));
    h.handle(Event::AssignOrder(names(&["alice", "bob"]))).await;
    h.handle(Event::OrderChanged(vec![0, 1, 2])).await;
    h.reactor.settle().await;

    assert_eq!(h.compositor.crops(), vec![]);
    assert_eq!(h.compositor.switches(), vec!["blank-black", "z3"]);
    // geometry is still computed for the scene
    let snapshot = h.reactor.session().snapshot();
    assert_eq!(snapshot.scenes["z3"].crops, gallery_crops(3));
}

#[test(tokio::test(start_paused = true))]
async fn unresolvable_slot_is_left_alone() {
    let mut h = Harness::new(FakeCompositor::with_galleries(3));
    h.participants.set(&["alice", "bob", "carol"]);
    h.handle(Event::AssignOrder(names(&["bob", "alice", "zed"]))).await;
    // index 5 is not in the participant list
    h.handle(Event::OrderChanged(vec![0, 1, 5])).await;

    let crops = gallery_crops(3);
    assert_eq!(h.compositor.crops(), vec![crop_call(3, 0, crops[1]), crop_call(3, 1, crops[0])]);
    let applied: Vec<_> = h
        .broadcasts()
        .into_iter()
        .filter_map(|e| match e {
            BroadcastEvent::CropsApplied { scene, applied, .. } => Some((scene, applied)),
            _ => None,
        })
        .collect();
    assert_eq!(applied, vec![("z3".to_string(), 2)]);
}

#[test(tokio::test(start_paused = true))]
async fn participant_read_failure_skips_reconcile_but_transitions() {
    let mut h = Harness::new(FakeCompositor::with_galleries(2));
    *h.participants.0.lock() = None;
    h.handle(Event::AssignOrder(names(&["alice", "bob"]))).await;
    h.compositor.take_calls();

    h.handle(Event::OrderChanged(vec![0, 1])).await;
    h.reactor.settle().await;

    assert_eq!(h.compositor.crops(), vec![]);
    assert_eq!(h.compositor.switches(), vec!["blank-black", "z2"]);
}

#[test(tokio::test(start_paused = true))]
async fn newer_count_supersedes_running_transition() {
    let mut h = Harness::new(FakeCompositor::with_galleries(6));
    h.handle(Event::OrderChanged(vec![0, 1, 2, 3])).await;
    // the fade to z4 is still waiting when the fifth tile shows up
    h.handle(Event::OrderChanged(vec![0, 1, 2, 3, 4])).await;
    h.reactor.settle().await;

    let switches = h.compositor.switches();
    assert!(!switches.contains(&"z4".to_string()), "{switches:?}");
    assert_eq!(switches.last().map(String::as_str), Some("z5"));

    let transitions: Vec<_> = h
        .broadcasts()
        .into_iter()
        .filter(|e| !matches!(e, BroadcastEvent::CropsApplied { .. }))
        .collect();
    assert_eq!(transitions, vec![
        BroadcastEvent::SceneTransitionStarted { target: "z4".into(), generation: 1 },
        BroadcastEvent::SceneTransitionStarted { target: "z5".into(), generation: 2 },
        BroadcastEvent::SceneTransitionCancelled { target: "z4".into(), generation: 1 },
        BroadcastEvent::SceneTransitionFinished { target: "z5".into(), generation: 2 },
    ]);
}

#[test(tokio::test(start_paused = true))]
async fn repeated_order_sends_nothing_new() {
    let mut h = Harness::new(FakeCompositor::with_galleries(3));
    h.handle(Event::AssignOrder(names(&["alice", "bob", "carol"]))).await;
    h.handle(Event::OrderChanged(vec![2, 0, 1])).await;
    h.reactor.settle().await;
    let first = h.compositor.take_calls();
    assert_eq!(first.iter().filter(|c| matches!(c, Call::Crop { .. })).count(), 3);

    h.handle(Event::OrderChanged(vec![2, 0, 1])).await;
    h.reactor.settle().await;
    assert_eq!(h.compositor.calls(), vec![]);
}

#[test(tokio::test(start_paused = true))]
async fn connect_crops_every_scene_and_enables_tracking() {
    let mut h = Harness::new(FakeCompositor::with_galleries(3));
    h.handle(Event::CompositorConnected).await;

    let mut expected = vec![];
    for count in 1..=3 {
        let crops = gallery_crops(count);
        expected.extend((0..count).map(|i| crop_call(count, i, crops[i])));
    }
    assert_eq!(h.compositor.calls(), expected);
    assert_eq!(*h.upstream.0.lock(), vec![
        UpstreamRequest::EnableGalleryTracking,
        UpstreamRequest::UpdateParticipants,
        UpstreamRequest::SaveParticipants,
    ]);

    let snapshot = h.reactor.session().snapshot();
    assert_eq!(snapshot.scenes.keys().collect::<Vec<_>>(), vec!["z1", "z2", "z3"]);
    assert_eq!(snapshot.participants.len(), 6);
    assert_eq!(snapshot.scenes["z1"].crops, vec![CropValues {
        left: 96.0,
        right: 96.0,
        top: 174.0,
        bottom: 174.0,
    }]);
    assert_eq!(h.reactor.crop_store().len(), 6);
}

#[test(tokio::test(start_paused = true))]
async fn transient_crop_failure_is_retried() {
    let mut config = Config::default();
    config.collaborator.retry_attempts = 1;
    let compositor = FakeCompositor::with_galleries(2);
    *compositor.transient_failures.lock() = 1;
    let mut h = Harness::with_config(compositor, config);

    h.handle(Event::Command(Command::CropAllScenes)).await;
    assert_eq!(h.compositor.crops().len(), 3);
}

#[test(tokio::test(start_paused = true))]
async fn failed_crop_does_not_stop_the_pass() {
    let mut compositor = FakeCompositor::with_galleries(3);
    compositor.broken_sources.insert(source_id(3, 1));
    let mut h = Harness::new(compositor);

    h.handle(Event::Command(Command::CropAllScenes)).await;

    let crops = gallery_crops(3);
    let z3: Vec<_> = h
        .compositor
        .crops()
        .into_iter()
        .filter(|c| matches!(c, Call::Crop { scene, .. } if scene == "z3"))
        .collect();
    assert_eq!(z3, vec![crop_call(3, 0, crops[0]), crop_call(3, 2, crops[2])]);
    assert!(h.broadcasts().contains(&BroadcastEvent::CropsApplied {
        scene: "z3".into(),
        tile_count: 3,
        applied: 2,
        generation: 3,
    }));

    // a later pass sends everything again; the broken item still fails alone
    h.compositor.take_calls();
    h.handle(Event::Command(Command::CropAllScenes)).await;
    assert_eq!(h.compositor.crops().len(), 5);
}

#[test(tokio::test(start_paused = true))]
async fn reconnect_crops_every_scene_again() {
    let mut h = Harness::new(FakeCompositor::with_galleries(3));
    h.handle(Event::CompositorConnected).await;
    let first = h.compositor.take_calls();
    assert_eq!(first.len(), 6);

    // a restarted compositor has lost every crop
    h.handle(Event::CompositorConnected).await;
    assert_eq!(h.compositor.calls(), first);
    assert_eq!(h.reactor.crop_store().len(), 6);
}

#[test(tokio::test(start_paused = true))]
async fn crop_all_command_resends_unchanged_crops() {
    let mut h = Harness::new(FakeCompositor::with_galleries(2));
    h.handle(Event::AssignOrder(names(&["alice", "bob"]))).await;
    h.handle(Event::OrderChanged(vec![0, 1])).await;
    h.reactor.settle().await;
    h.compositor.take_calls();

    h.handle(Event::Command(Command::CropAllScenes)).await;
    let crops = gallery_crops(2);
    assert_eq!(h.compositor.crops(), vec![
        crop_call(1, 0, gallery_crops(1)[0]),
        crop_call(2, 0, crops[0]),
        crop_call(2, 1, crops[1]),
    ]);
}

#[test(tokio::test(start_paused = true))]
async fn list_sources_broadcasts_scenes() {
    let mut h = Harness::new(FakeCompositor::with_galleries(2));
    h.handle(Event::Command(Command::ListSources)).await;

    assert_eq!(h.compositor.calls(), vec![]);
    let scenes = h.compositor.scenes.clone();
    assert_eq!(h.broadcasts(), vec![BroadcastEvent::SourcesListed { scenes }]);
}

#[test(tokio::test(start_paused = true))]
async fn operator_commands_pass_through() {
    let mut h = Harness::new(FakeCompositor::with_galleries(1));
    h.handle(Event::Command(Command::SwitchScene("z1".into()))).await;
    h.handle(Event::Command(Command::SetTransition {
        name: "Cut".into(),
        duration: None,
    }))
    .await;
    assert_eq!(h.compositor.calls(), vec![
        Call::Switch("z1".into()),
        Call::Transition("Cut".into(), None),
    ]);
}

#[test(tokio::test(start_paused = true))]
async fn scene_prefix_selects_target_scene() {
    let mut h = Harness::new(FakeCompositor::with_galleries(2));
    h.handle(Event::SetScenePrefix("gallery-".into())).await;
    h.handle(Event::OrderChanged(vec![0, 1])).await;
    h.reactor.settle().await;

    // no such scene to crop, but the fade still targets it
    assert_eq!(h.compositor.crops(), vec![]);
    assert_eq!(h.compositor.switches().last().map(String::as_str), Some("gallery-2"));
    assert_eq!(h.reactor.session().current_scene_name(), "gallery-2");
}

#[test(tokio::test(start_paused = true))]
async fn events_are_processed_in_order_through_the_channel() {
    let h = Harness::new(FakeCompositor::with_galleries(2));
    let (tx, rx) = actor::channel();
    let (response, snapshot) = oneshot::channel();

    tx.send(Event::AssignOrder(names(&["bob", "alice"])));
    tx.send(Event::OrderChanged(vec![0, 1]));
    tx.send(Event::CountChanged(2));
    tx.send(Event::QueryState { response });
    drop(tx);

    let compositor = h.compositor.clone();
    let ((), snapshot) = tokio::join!(h.reactor.run(rx), snapshot);
    let snapshot = snapshot.unwrap();

    assert_eq!(snapshot.count, 2);
    assert_eq!(snapshot.natural_order, vec![0, 1]);
    assert_eq!(snapshot.assigned_order, vec!["bob", "alice"]);
    // run() returns only after the fade has completed
    assert_eq!(compositor.switches(), vec!["blank-black", "z2"]);
}
