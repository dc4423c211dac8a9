//! Clip playback primitive.
//!
//! A `Mixer` plays synthesized clips as weighted layers with crossfades,
//! looping or one-shot playback, and edge-triggered finish events.

use crate::bone::{BoneId, Clip, PoseSnapshot};
use glam::Quat;

/// Identifies one playback of a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipHandle(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Wrap around indefinitely
    #[default]
    Repeat,
    /// Play once, then hold the last frame
    Once,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    pub looping: LoopMode,
    /// Seconds to ramp weight from 0 to 1 (0 = instant)
    pub fade_in: f32,
    /// Playback speed; negative plays backwards (looping clips only)
    pub time_scale: f32,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            looping: LoopMode::Repeat,
            fade_in: 0.0,
            time_scale: 1.0,
        }
    }
}

impl PlayOptions {
    pub fn once(fade_in: f32) -> Self {
        Self {
            looping: LoopMode::Once,
            fade_in,
            time_scale: 1.0,
        }
    }

    pub fn looped(fade_in: f32) -> Self {
        Self {
            looping: LoopMode::Repeat,
            fade_in,
            time_scale: 1.0,
        }
    }

    pub fn with_time_scale(self, time_scale: f32) -> Self {
        Self { time_scale, ..self }
    }
}

/// Emitted exactly once when a one-shot clip reaches its end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipFinished<T> {
    pub handle: ClipHandle,
    pub tag: T,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Fade {
    Steady,
    In { rate: f32 },
    Out { rate: f32 },
}

#[derive(Debug, Clone)]
struct Layer<T> {
    handle: ClipHandle,
    tag: T,
    clip: Clip,
    time: f32,
    weight: f32,
    fade: Fade,
    looping: LoopMode,
    time_scale: f32,
    finished: bool,
}

impl<T> Layer<T> {
    /// Advance weight; returns false once a fade-out has completed
    fn advance_weight(&mut self, dt: f32) -> bool {
        match self.fade {
            Fade::Steady => true,
            Fade::In { rate } => {
                self.weight = (self.weight + rate * dt).min(1.0);
                if self.weight >= 1.0 {
                    self.fade = Fade::Steady;
                }
                true
            }
            Fade::Out { rate } => {
                self.weight -= rate * dt;
                self.weight > 0.0
            }
        }
    }
}

/// Weighted clip layers over a base pose.
///
/// Tags let the owner identify which clip finished without holding handles.
#[derive(Debug, Clone)]
pub struct Mixer<T> {
    layers: Vec<Layer<T>>,
    next_handle: u32,
}

impl<T> Default for Mixer<T> {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            next_handle: 0,
        }
    }
}

impl<T: Copy> Mixer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a clip as a new layer
    pub fn play(&mut self, clip: Clip, tag: T, options: PlayOptions) -> ClipHandle {
        let handle = ClipHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);

        let (weight, fade) = if options.fade_in > 0.0 {
            (
                0.0,
                Fade::In {
                    rate: 1.0 / options.fade_in,
                },
            )
        } else {
            (1.0, Fade::Steady)
        };
        let time = if options.time_scale < 0.0 {
            clip.duration
        } else {
            0.0
        };

        self.layers.push(Layer {
            handle,
            tag,
            clip,
            time,
            weight,
            fade,
            looping: options.looping,
            time_scale: options.time_scale,
            finished: false,
        });
        handle
    }

    /// Fade every current layer out and start a clip fading in over the same duration
    pub fn crossfade_to(&mut self, clip: Clip, tag: T, options: PlayOptions) -> ClipHandle {
        self.fade_out_all(options.fade_in);
        self.play(clip, tag, options)
    }

    /// Fade every layer out (0 = remove immediately)
    pub fn fade_out_all(&mut self, duration: f32) {
        if duration <= 0.0 {
            self.layers.clear();
            return;
        }
        for layer in &mut self.layers {
            layer.fade = Fade::Out {
                rate: layer.weight.max(f32::EPSILON) / duration,
            };
        }
    }

    pub fn set_time_scale(&mut self, handle: ClipHandle, time_scale: f32) {
        if let Some(layer) = self.layers.iter_mut().find(|l| l.handle == handle) {
            layer.time_scale = time_scale;
        }
    }

    pub fn stop_all(&mut self) {
        self.layers.clear();
    }

    /// The clip a layer plays, while that layer is still mixed in
    pub fn clip(&self, handle: ClipHandle) -> Option<&Clip> {
        self.layers
            .iter()
            .find(|l| l.handle == handle)
            .map(|l| &l.clip)
    }

    /// Advance time and weights. Returns the one-shot clips that completed
    /// during this step, in layer order.
    pub fn advance(&mut self, dt: f32) -> Vec<ClipFinished<T>> {
        let mut finished = Vec::new();

        for layer in &mut self.layers {
            let duration = layer.clip.duration;
            layer.time += dt * layer.time_scale;
            match layer.looping {
                LoopMode::Repeat => {
                    if duration > 0.0 {
                        layer.time = layer.time.rem_euclid(duration);
                    }
                }
                LoopMode::Once => {
                    layer.time = layer.time.clamp(0.0, duration);
                    let at_end = if layer.time_scale < 0.0 {
                        layer.time <= 0.0
                    } else {
                        layer.time >= duration
                    };
                    if at_end && !layer.finished {
                        layer.finished = true;
                        finished.push(ClipFinished {
                            handle: layer.handle,
                            tag: layer.tag,
                        });
                    }
                }
            }
        }

        self.layers.retain_mut(|layer| layer.advance_weight(dt));
        finished
    }

    /// Blend all layers over the base pose.
    ///
    /// Per bone, layers with a track are accumulated by weight; when their
    /// total weight is below one the remainder comes from the base.
    pub fn sample(&self, base: &PoseSnapshot) -> PoseSnapshot {
        let mut result = *base;

        for bone in base.present().iter() {
            if let Some(blended) = self.blend_bone(bone) {
                let (q, total) = blended;
                let q = if total < 1.0 {
                    base.rotation(bone).map_or(q, |b| b.slerp(q, total))
                } else {
                    q
                };
                result = result.with_rotation(bone, q);
            }
        }
        result
    }

    fn blend_bone(&self, bone: BoneId) -> Option<(Quat, f32)> {
        let mut acc: Option<(Quat, f32)> = None;
        for layer in &self.layers {
            if layer.weight <= 0.0 {
                continue;
            }
            let Some(track) = layer.clip.track(bone) else {
                continue;
            };
            let q = track.sample(layer.time);
            acc = Some(match acc {
                None => (q, layer.weight),
                Some((acc_q, acc_w)) => {
                    let total = acc_w + layer.weight;
                    (acc_q.slerp(q, layer.weight / total), total)
                }
            });
        }
        acc.map(|(q, w)| (q.normalize(), w.min(1.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bone::{same_orientation, BoneTrack, RotationKeyframe};

    fn clip(duration: f32, end: Quat) -> Clip {
        Clip {
            name: "test".to_string(),
            duration,
            tracks: vec![BoneTrack {
                bone: BoneId::Spine,
                keyframes: vec![
                    RotationKeyframe {
                        time: 0.0,
                        rotation: Quat::IDENTITY,
                    },
                    RotationKeyframe {
                        time: duration,
                        rotation: end,
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_once_fires_exactly_once_and_holds() {
        let end = Quat::from_rotation_x(1.0);
        let mut mixer = Mixer::new();
        let handle = mixer.play(clip(0.3, end), 'a', PlayOptions::once(0.0));

        assert!(mixer.advance(0.2).is_empty());
        let events = mixer.advance(0.2);
        assert_eq!(events, vec![ClipFinished { handle, tag: 'a' }]);
        assert!(mixer.advance(0.2).is_empty());

        let pose = mixer.sample(&PoseSnapshot::identity());
        assert!(same_orientation(pose.rotation(BoneId::Spine).unwrap(), end));
    }

    #[test]
    fn test_repeat_wraps_and_never_fires() {
        let mut mixer = Mixer::new();
        let handle = mixer.play(clip(0.5, Quat::from_rotation_y(0.5)), 0u8, PlayOptions::looped(0.0));
        for _ in 0..20 {
            assert!(mixer.advance(0.1).is_empty());
        }
        assert!(mixer.clip(handle).is_some());
    }

    #[test]
    fn test_backwards_loop_wraps() {
        let end = Quat::from_rotation_y(0.5);
        let mut mixer = Mixer::new();
        mixer.play(clip(1.0, end), 0u8, PlayOptions::looped(0.0).with_time_scale(-1.0));
        mixer.advance(0.25);

        let pose = mixer.sample(&PoseSnapshot::identity());
        let expected = Quat::IDENTITY.slerp(end, 0.75);
        assert!(same_orientation(pose.rotation(BoneId::Spine).unwrap(), expected));
    }

    #[test]
    fn test_fade_in_blends_from_base() {
        let end = Quat::from_rotation_x(1.0);
        let live = PoseSnapshot::identity().with_rotation(BoneId::Spine, Quat::from_rotation_z(0.4));

        let mut mixer = Mixer::new();
        mixer.play(clip(0.001, end), 0u8, PlayOptions::once(1.0));
        mixer.advance(0.5);

        let pose = mixer.sample(&live);
        let expected = Quat::from_rotation_z(0.4).slerp(end, 0.5);
        assert!(same_orientation(pose.rotation(BoneId::Spine).unwrap(), expected));

        // Bones without tracks keep the base
        assert!(same_orientation(pose.rotation(BoneId::Head).unwrap(), Quat::IDENTITY));
    }

    #[test]
    fn test_crossfade_removes_old_layers() {
        let mut mixer = Mixer::new();
        let old = mixer.play(clip(1.0, Quat::from_rotation_x(0.2)), 1u8, PlayOptions::looped(0.0));
        let new = mixer.crossfade_to(clip(1.0, Quat::from_rotation_x(0.4)), 2u8, PlayOptions::looped(0.2));

        mixer.advance(0.1);
        assert!(mixer.clip(old).is_some());
        mixer.advance(0.15);
        assert!(mixer.clip(old).is_none());
        assert!(mixer.clip(new).is_some());
    }

    #[test]
    fn test_faded_out_once_clip_does_not_fire() {
        let mut mixer = Mixer::new();
        mixer.play(clip(1.0, Quat::from_rotation_x(0.2)), 1u8, PlayOptions::once(0.0));
        mixer.fade_out_all(0.0);
        assert!(mixer.advance(2.0).is_empty());
    }
}
