// Copyright 2026 the Weft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental repaint checked pixel for pixel against a twin scene that
//! redraws everything on every update.

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::vec::Vec;

use weft_core::backend::{Buffer, NoopObserver, ResourceKey};
use weft_core::region::{Rect, Region};
use weft_core::subcompositor::{SubcompositorConfig, UpdateOutcome};
use weft_core::transform::BufferTransform;
use weft_core::view::{Scene, SubcompositorId, ViewId};

use crate::pixmap::{Pixmap, Rgba};
use crate::swapchain::{SoftwareTarget, SwapchainConfig};

struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }

    fn range(&mut self, lo: i32, hi: i32) -> i32 {
        let span = u64::try_from(hi - lo).unwrap();
        lo + i32::try_from(self.below(span)).unwrap()
    }

    fn color(&mut self, opaque: bool) -> Rgba {
        let c = |rng: &mut Self| u8::try_from(rng.below(256)).unwrap();
        let (r, g, b) = (c(self), c(self), c(self));
        let a = if opaque {
            255
        } else {
            [0, 64, 128, 255][usize::try_from(self.below(4)).unwrap()]
        };
        Rgba::straight(r, g, b, a)
    }
}

/// One scene and the target it draws on.
struct Half {
    scene: Scene,
    sub: SubcompositorId,
    target: SoftwareTarget,
}

impl Half {
    fn new(buffers: usize) -> Self {
        let mut scene = Scene::new();
        let sub = scene.create_subcompositor(SubcompositorConfig::OFFSCREEN);
        let target = SoftwareTarget::new(SwapchainConfig {
            buffers,
            ..SwapchainConfig::DEFAULT
        });
        scene.set_target(sub, Some(Box::new(target.clone())));
        Self { scene, sub, target }
    }
}

/// Per-view state the driver tracks to keep client contracts honest.
struct Client {
    view: ViewId,
    key: u64,
    size: (i32, i32),
    opaque: bool,
    attached: bool,
}

struct Twins {
    fast: Half,
    full: Half,
    clients: Vec<Client>,
    next_key: u64,
}

impl Twins {
    fn new(buffers: usize) -> Self {
        Self {
            fast: Half::new(buffers),
            full: Half::new(1),
            clients: Vec::new(),
            next_key: 0,
        }
    }

    fn both(&mut self, mut f: impl FnMut(&mut Scene, SubcompositorId)) {
        f(&mut self.fast.scene, self.fast.sub);
        f(&mut self.full.scene, self.full.sub);
    }

    fn register(&self, key: u64, pixmap: &Pixmap) {
        self.fast.target.register(ResourceKey(key), pixmap.clone());
        self.full.target.register(ResourceKey(key), pixmap.clone());
    }

    fn add_client(&mut self) {
        let mut view = None;
        self.both(|scene, _| view = Some(scene.create_view()));
        let view = view.unwrap();
        self.clients.push(Client {
            view,
            key: 0,
            size: (0, 0),
            opaque: false,
            attached: false,
        });
    }

    /// Attaches fresh contents, damaging all of it as a client must.
    fn attach(&mut self, rng: &mut XorShift, i: usize) {
        self.next_key += 1;
        let key = self.next_key;
        // Even sizes keep every view pixel inside the buffer at scale 2.
        let w = rng.range(1, 12) * 2;
        let h = rng.range(1, 12) * 2;
        let opaque = rng.below(2) == 0;
        let pixmap = Pixmap::from_fn(w, h, |_, _| rng.color(opaque));
        // Clients may only declare pixels opaque that really are.
        let opaque = pixmap.is_opaque();
        self.register(key, &pixmap);

        let view = self.clients[i].view;
        self.both(|scene, _| {
            scene.attach_buffer(view, Some(Rc::new(Buffer::new(ResourceKey(key), w, h))));
            scene.damage_buffer(view, &Region::from_rect(Rect::new(0, 0, w, h)));
            let opaque_region = if opaque {
                Region::from_rect(Rect::new(0, 0, w, h))
            } else {
                Region::new()
            };
            scene.set_opaque_region(view, opaque_region);
        });
        let client = &mut self.clients[i];
        client.key = key;
        client.size = (w, h);
        client.opaque = opaque;
        client.attached = true;
    }

    /// Redraws part of a buffer in place and damages exactly that part.
    fn scribble(&mut self, rng: &mut XorShift, i: usize) {
        let Client {
            view,
            key,
            size: (w, h),
            opaque,
            attached,
        } = self.clients[i];
        if !attached {
            return;
        }
        let x0 = rng.range(0, w);
        let y0 = rng.range(0, h);
        let rect = Rect::new(x0, y0, rng.range(x0 + 1, w + 1), rng.range(y0 + 1, h + 1));
        let color = rng.color(opaque);
        for target in [&self.fast.target, &self.full.target] {
            target.with_store(|store| {
                store
                    .get_mut(ResourceKey(key))
                    .unwrap()
                    .fill_rect(rect, color);
            });
        }
        self.both(|scene, _| scene.damage_buffer(view, &Region::from_rect(rect)));
    }

    fn step(&mut self, rng: &mut XorShift) {
        let i = usize::try_from(rng.below(self.clients.len() as u64)).unwrap();
        let view = self.clients[i].view;
        match rng.below(11) {
            0 => {
                let (x, y) = (rng.range(-20, 40), rng.range(-20, 40));
                self.both(|scene, _| scene.move_to(view, x, y));
            }
            1 => {
                if rng.below(5) == 0 {
                    self.both(|scene, _| scene.attach_buffer(view, None));
                    self.clients[i].attached = false;
                } else {
                    self.attach(rng, i);
                }
            }
            2 | 3 => self.scribble(rng, i),
            4 => {
                let scene = &self.fast.scene;
                let attached = scene.parent(view).is_some() || scene.subcompositor_of(view).is_some();
                if attached {
                    self.both(|scene, _| scene.unparent(view));
                } else {
                    let j = usize::try_from(rng.below(self.clients.len() as u64)).unwrap();
                    let parent = self.clients[j].view;
                    let mut ancestor = Some(parent);
                    let mut cycle = false;
                    while let Some(a) = ancestor {
                        cycle |= a == view;
                        ancestor = self.fast.scene.parent(a);
                    }
                    if cycle || rng.below(3) == 0 {
                        self.both(|scene, sub| scene.insert(sub, view));
                    } else {
                        self.both(|scene, _| scene.insert(parent, view));
                    }
                }
            }
            5 => {
                if rng.below(2) == 0 {
                    self.both(|scene, _| scene.unmap(view));
                } else {
                    self.both(|scene, _| scene.map(view));
                }
            }
            6 => {
                let t = BufferTransform::ALL[usize::try_from(rng.below(8)).unwrap()];
                let scale = i32::try_from(rng.below(2)).unwrap() + 1;
                self.both(|scene, _| {
                    scene.set_transform(view, t);
                    scene.set_scale(view, scale);
                });
            }
            7 => {
                if rng.below(2) == 0 {
                    self.both(|scene, _| scene.skip(view));
                } else {
                    self.both(|scene, _| scene.unskip(view));
                }
            }
            8 => {
                // Lost window contents come back from the views alone. The
                // scene is settled here, so the window must match the
                // full redraw right away.
                let x0 = rng.range(-5, 50);
                let y0 = rng.range(-5, 50);
                let rect = Rect::new(x0, y0, rng.range(x0 + 1, 60), rng.range(y0 + 1, 60));
                self.fast.scene.expose(self.fast.sub, rect);
                self.compare(&format!("expose {rect:?}"));
            }
            9 => {
                let Client {
                    size: (w, h),
                    opaque,
                    attached,
                    ..
                } = self.clients[i];
                if !attached {
                    return;
                }
                // Only the declaration changes; no pixels do.
                let region = if opaque && rng.below(3) != 0 {
                    let x0 = rng.range(0, w);
                    let y0 = rng.range(0, h);
                    Region::from_rect(Rect::new(
                        x0,
                        y0,
                        rng.range(x0 + 1, w + 1),
                        rng.range(y0 + 1, h + 1),
                    ))
                } else {
                    Region::new()
                };
                self.both(|scene, _| scene.set_opaque_region(view, region.clone()));
            }
            // Idle: the chain keeps cycling without new damage.
            _ => {}
        }
    }

    fn compare(&self, context: &str) {
        let fast = self.fast.target.window();
        let full = self.full.target.window();
        if let Some((x, y)) = fast.first_difference(&full) {
            panic!(
                "{context}: pixel ({x}, {y}) is {:?}, expected {:?}",
                fast.get(x, y),
                full.get(x, y)
            );
        }
    }

    fn update_and_compare(&mut self, context: &str) {
        self.fast.scene.update(self.fast.sub, &mut NoopObserver);
        self.full.scene.garbage(self.full.sub);
        let outcome = self.full.scene.update(self.full.sub, &mut NoopObserver);
        assert!(
            matches!(
                outcome,
                UpdateOutcome::Composited { .. } | UpdateOutcome::Suppressed
            ),
            "{context}: {outcome:?}"
        );
        self.compare(context);
    }
}

fn run(seed: u64, buffers: usize, steps: u32) {
    let mut rng = XorShift(seed);
    let mut twins = Twins::new(buffers);
    for i in 0..6 {
        twins.add_client();
        twins.attach(&mut rng, i);
        let view = twins.clients[i].view;
        let (x, y) = (rng.range(0, 30), rng.range(0, 30));
        twins.both(|scene, sub| {
            scene.move_to(view, x, y);
            scene.insert(sub, view);
        });
    }
    twins.update_and_compare("initial");
    for step in 0..steps {
        twins.step(&mut rng);
        twins.update_and_compare(&format!("seed {seed:#x}, {buffers} buffers, step {step}"));
    }
}

#[test]
fn single_buffer_matches_full_redraw() {
    run(0x5eed_0001, 1, 400);
}

#[test]
fn double_buffer_matches_full_redraw() {
    run(0x5eed_0002, 2, 400);
}

#[test]
fn triple_buffer_matches_full_redraw() {
    run(0x5eed_0003, 3, 400);
}

#[test]
fn deep_chain_falls_back_to_full_redraws() {
    // Ages beyond the replay ring must still be correct.
    run(0x5eed_0004, 4, 200);
}

#[test]
fn incremental_updates_draw_less() {
    let mut rng = XorShift(0xd1ff);
    let mut twins = Twins::new(2);
    for i in 0..4 {
        twins.add_client();
        twins.attach(&mut rng, i);
        let view = twins.clients[i].view;
        let offset = i32::try_from(i).unwrap() * 10;
        twins.both(|scene, sub| {
            scene.move_to(view, offset, offset);
            scene.insert(sub, view);
        });
    }
    twins.update_and_compare("initial");
    for step in 0..50 {
        twins.scribble(&mut rng, step % 4);
        twins.update_and_compare("scribble");
    }
    assert!(twins.fast.target.stats().pixels_drawn < twins.full.target.stats().pixels_drawn / 2);
}

#[test]
fn expose_keeps_the_latest_frame_on_aged_buffers() {
    let mut scene = Scene::new();
    let sub = scene.create_subcompositor(SubcompositorConfig::OFFSCREEN);
    let target = SoftwareTarget::new(SwapchainConfig::DEFAULT);
    scene.set_target(sub, Some(Box::new(target.clone())));

    let red = Rgba::opaque(255, 0, 0);
    let blue = Rgba::opaque(0, 0, 255);
    target.register(ResourceKey(1), Pixmap::filled(20, 20, red));
    let view = scene.create_view();
    scene.attach_buffer(view, Some(Rc::new(Buffer::new(ResourceKey(1), 20, 20))));
    scene.set_opaque_region(view, Region::from_rect(Rect::new(0, 0, 20, 20)));
    scene.insert(sub, view);
    for _ in 0..3 {
        scene.update(sub, &mut NoopObserver);
    }

    let damaged = Rect::new(10, 10, 15, 15);
    target.with_store(|store| {
        if let Some(pixmap) = store.get_mut(ResourceKey(1)) {
            pixmap.fill_rect(damaged, blue);
        }
    });
    scene.damage_buffer(view, &Region::from_rect(damaged));
    assert!(matches!(
        scene.update(sub, &mut NoopObserver),
        UpdateOutcome::Composited { .. }
    ));
    assert_eq!(target.window().get(12, 12), blue);

    // The back buffer never saw the blue square.
    assert!(scene.expose(sub, Rect::new(0, 0, 2, 2)));
    let window = target.window();
    assert_eq!(window.get(12, 12), blue);
    assert_eq!(window.get(1, 1), red);
    assert_eq!(window.get(18, 18), red);
}
