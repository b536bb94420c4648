use crate::animation::Track;
use crate::surface::{AnimatableSurface, ElementId, ElementSpec, Target, Timing, VisualState};
use crate::types::{Color, Point, Viewport};
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Clone, Debug)]
struct Removal {
    at: f64,
    generation: u64,
}

/// An element on the stage with one animated track per property.
#[derive(Clone, Debug)]
pub struct StageElement {
    pub spec: ElementSpec,
    pub x: Track<f32>,
    pub y: Track<f32>,
    pub opacity: Track<f32>,
    pub fill: Track<Color>,
    removal: Option<Removal>,
}

impl StageElement {
    fn new(spec: ElementSpec, initial: VisualState, now: f64) -> Self {
        Self {
            spec,
            x: Track::still(initial.position.x, now),
            y: Track::still(initial.position.y, now),
            opacity: Track::still(initial.opacity, now),
            fill: Track::still(initial.fill, now),
            removal: None,
        }
    }

    pub fn state(&self) -> VisualState {
        VisualState {
            position: Point::new(self.x.value(), self.y.value()),
            opacity: self.opacity.value(),
            fill: self.fill.value(),
        }
    }

    /// The state the element settles on once its pending tweens finish.
    pub fn target_state(&self) -> VisualState {
        VisualState {
            position: Point::new(self.x.target(), self.y.target()),
            opacity: self.opacity.target(),
            fill: self.fill.target(),
        }
    }

    pub fn pending_removal(&self) -> Option<f64> {
        self.removal.as_ref().map(|r| r.at)
    }

    fn update(&mut self, now: f64) {
        self.x.update(now);
        self.y.update(now);
        self.opacity.update(now);
        self.fill.update(now);
    }
}

/// In-memory scene of tracked elements driven by a millisecond clock.
///
/// The stage is the default [`AnimatableSurface`]: the driver schedules tweens on it,
/// the host advances its clock, and the renderer paints its sampled state.
#[derive(Clone, Debug)]
pub struct Stage {
    elements: BTreeMap<ElementId, StageElement>,
    viewport: Viewport,
    now: f64,
    generation: u64,
}

impl Stage {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            elements: BTreeMap::new(),
            viewport: Viewport::new(width, height),
            now: 0.0,
            generation: 0,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = Viewport::new(width, height);
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn element(&self, id: &ElementId) -> Option<&StageElement> {
        self.elements.get(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Every element, in drawing order.
    pub fn iter(&self) -> impl Iterator<Item = (&ElementId, &StageElement)> {
        self.elements.iter()
    }

    /// Absolute position and effective opacity, composed through the parent chain.
    pub fn absolute(&self, id: &ElementId) -> Option<(Point, f32)> {
        let element = self.elements.get(id)?;
        let state = element.state();
        match &element.spec.parent {
            Some(parent) => {
                let (origin, opacity) = self.absolute(parent)?;
                Some((
                    Point::new(origin.x + state.position.x, origin.y + state.position.y),
                    opacity * state.opacity,
                ))
            }
            None => Some((state.position, state.opacity)),
        }
    }

    /// Advances the clock, samples every track and applies due removals of the
    /// current generation.
    pub fn advance(&mut self, now: f64) {
        self.now = now;
        for element in self.elements.values_mut() {
            element.update(now);
        }

        let mut due = Vec::new();
        for (id, element) in self.elements.iter_mut() {
            if let Some(removal) = &element.removal {
                if removal.generation != self.generation {
                    trace!(element = %id, "dropping stale removal");
                    element.removal = None;
                } else if removal.at <= now {
                    due.push(id.clone());
                }
            }
        }
        for id in due {
            self.remove(&id);
        }
    }

    /// Clock time at which every pending tween and removal has completed.
    pub fn settled_at(&self) -> f64 {
        self.elements
            .values()
            .flat_map(|e| {
                [
                    e.x.end(),
                    e.y.end(),
                    e.opacity.end(),
                    e.fill.end(),
                    e.pending_removal().unwrap_or(0.0),
                ]
            })
            .fold(self.now, f64::max)
    }
}

impl AnimatableSurface for Stage {
    fn now(&self) -> f64 {
        self.now
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn begin(&mut self, generation: u64) {
        self.generation = generation;
    }

    fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    fn ids(&self) -> Vec<ElementId> {
        self.elements.keys().cloned().collect()
    }

    fn spawn(&mut self, id: ElementId, spec: ElementSpec, initial: VisualState) {
        self.elements
            .insert(id, StageElement::new(spec, initial, self.now));
    }

    fn animate_to(&mut self, id: &ElementId, target: Target, timing: Timing) {
        let now = self.now;
        let Some(element) = self.elements.get_mut(id) else {
            trace!(element = %id, "animate_to on missing element");
            return;
        };
        let Timing {
            duration,
            delay,
            easing,
        } = timing;
        match target {
            Target::Position(p) => {
                element.x.retarget(now, p.x, delay, duration, easing);
                element.y.retarget(now, p.y, delay, duration, easing);
            }
            Target::Opacity(o) => element.opacity.retarget(now, o, delay, duration, easing),
            Target::Fill(c) => element.fill.retarget(now, c, delay, duration, easing),
        }
        element.update(now);
    }

    fn chain_to(&mut self, id: &ElementId, target: Target, timing: Timing) {
        let now = self.now;
        let Some(element) = self.elements.get_mut(id) else {
            trace!(element = %id, "chain_to on missing element");
            return;
        };
        let Timing {
            duration,
            delay,
            easing,
        } = timing;
        match target {
            Target::Position(p) => {
                element.x.chain(now, p.x, delay, duration, easing);
                element.y.chain(now, p.y, delay, duration, easing);
            }
            Target::Opacity(o) => element.opacity.chain(now, o, delay, duration, easing),
            Target::Fill(c) => element.fill.chain(now, c, delay, duration, easing),
        }
        element.update(now);
    }

    fn remove_after(&mut self, id: &ElementId, delay: f64) {
        let at = self.now + delay.max(0.0);
        let generation = self.generation;
        if let Some(element) = self.elements.get_mut(id) {
            element.removal = Some(Removal { at, generation });
        }
    }

    fn remove(&mut self, id: &ElementId) {
        let children: Vec<ElementId> = self
            .elements
            .iter()
            .filter(|(_, e)| e.spec.parent.as_ref() == Some(id))
            .map(|(child, _)| child.clone())
            .collect();
        for child in children {
            self.remove(&child);
        }
        self.elements.remove(id);
    }

    fn state(&self, id: &ElementId) -> Option<VisualState> {
        self.elements.get(id).map(StageElement::state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::EasingType;
    use crate::surface::ElementKind;

    fn cell_spec(parent: ElementId) -> ElementSpec {
        ElementSpec {
            kind: ElementKind::Cell,
            parent: Some(parent),
            label: "x".into(),
            width: 99.0,
            height: 29.0,
        }
    }

    #[test]
    fn children_follow_their_parent() {
        let mut stage = Stage::new(600.0, 400.0);
        stage.spawn(
            ElementId::Row(1),
            ElementSpec::group(None),
            VisualState::at(Point::new(10.0, 20.0)).with_opacity(0.5),
        );
        stage.spawn(
            ElementId::Cell(1, 0),
            cell_spec(ElementId::Row(1)),
            VisualState::at(Point::new(100.0, 0.0)),
        );
        let (pos, opacity) = stage.absolute(&ElementId::Cell(1, 0)).unwrap();
        assert_eq!(pos, Point::new(110.0, 20.0));
        assert!((opacity - 0.5).abs() < 1e-6);

        stage.remove(&ElementId::Row(1));
        assert!(stage.is_empty());
    }

    #[test]
    fn removal_fires_only_for_current_generation() {
        let mut stage = Stage::new(600.0, 400.0);
        stage.begin(1);
        stage.spawn(ElementId::Row(1), ElementSpec::group(None), VisualState::at(Point::ZERO));
        stage.spawn(ElementId::Row(2), ElementSpec::group(None), VisualState::at(Point::ZERO));
        stage.remove_after(&ElementId::Row(1), 100.0);
        stage.remove_after(&ElementId::Row(2), 100.0);

        stage.advance(50.0);
        stage.begin(2);
        stage.remove_after(&ElementId::Row(2), 10.0);
        stage.advance(200.0);

        assert!(stage.contains(&ElementId::Row(1)), "stale removal must be a no-op");
        assert!(!stage.contains(&ElementId::Row(2)));
    }

    #[test]
    fn respawn_clears_pending_removal() {
        let mut stage = Stage::new(600.0, 400.0);
        stage.begin(1);
        stage.spawn(ElementId::Row(7), ElementSpec::group(None), VisualState::at(Point::ZERO));
        stage.remove_after(&ElementId::Row(7), 100.0);
        stage.spawn(ElementId::Row(7), ElementSpec::group(None), VisualState::at(Point::ZERO));
        stage.advance(500.0);
        assert!(stage.contains(&ElementId::Row(7)));
    }

    #[test]
    fn animate_to_tweens_from_sampled_position() {
        let mut stage = Stage::new(600.0, 400.0);
        stage.spawn(ElementId::Row(1), ElementSpec::group(None), VisualState::at(Point::ZERO));
        stage.animate_to(
            &ElementId::Row(1),
            Target::Position(Point::new(0.0, 100.0)),
            Timing::new(100.0, 0.0, EasingType::Linear),
        );
        stage.advance(50.0);
        let y = stage.state(&ElementId::Row(1)).unwrap().position.y;
        assert!((y - 50.0).abs() < 1e-3);
        assert!((stage.settled_at() - 100.0).abs() < 1e-6);

        stage.advance(100.0);
        let y = stage.state(&ElementId::Row(1)).unwrap().position.y;
        assert!((y - 100.0).abs() < 1e-4);
    }
}
