extern crate env_logger;
extern crate gpucache;
extern crate rand;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gpucache::prelude::*;
use gpucache::video::errors::Error;

fn cache() -> ContextStateCache<RecordingBackend> {
    let _ = env_logger::try_init();
    ContextStateCache::new(RecordingBackend::new(), &ContextParams::default())
}

fn buffer(i: u32) -> Bound {
    Bound::new(
        ResourceId::Buffer(BufferHandle::new(i, 1)),
        NativeHandle(100 + u64::from(i)),
    )
}

fn texture(i: u32) -> ResourceId {
    ResourceId::Texture(TextureHandle::new(i, 1))
}

fn srv(i: u32) -> Bound {
    Bound::new(texture(i), NativeHandle(200 + u64::from(i)))
}

fn rtv(i: u32) -> Bound {
    Bound::new(texture(i), NativeHandle(300 + u64::from(i)))
}

fn dsv(i: u32) -> Bound {
    Bound::new(texture(i), NativeHandle(400 + u64::from(i)))
}

#[test]
fn constant_buffer_lifecycle() {
    let mut cache = cache();
    let a = buffer(0);
    let b = buffer(1);
    let vs = ShaderStage::Vertex;

    cache.set_constant_buffers(vs, 0, &[Some(a)]).unwrap();
    assert_eq!(cache.backend_mut().take_calls().len(), 1);

    cache.set_constant_buffers(vs, 0, &[Some(a)]).unwrap();
    assert!(cache.backend().calls().is_empty());

    cache.set_constant_buffers(vs, 0, &[Some(b)]).unwrap();
    assert_eq!(
        cache.backend_mut().take_calls(),
        vec![NativeCall::BindConstantBuffers {
            stage: vs,
            start: 0,
            buffers: vec![Some(b.native)],
        }]
    );
    assert_eq!(cache.state().constant_buffers(vs)[0], Some(b));

    cache.on_buffer_destroyed(b.resource).unwrap();
    assert_eq!(
        cache.backend_mut().take_calls(),
        vec![NativeCall::BindConstantBuffers {
            stage: vs,
            start: 0,
            buffers: vec![None],
        }]
    );
    assert_eq!(cache.state().constant_buffers(vs)[0], None);
}

#[test]
fn changed_slots_coalesce_into_runs() {
    let mut cache = cache();
    let a = buffer(0);
    let b = buffer(1);
    let ps = ShaderStage::Pixel;

    cache.set_constant_buffers(ps, 0, &[Some(a); 8]).unwrap();
    assert_eq!(cache.backend_mut().take_calls().len(), 1);

    let mut desired = [Some(a); 8];
    for &i in &[2, 3, 7] {
        desired[i] = Some(b);
    }

    cache.set_constant_buffers(ps, 0, &desired).unwrap();
    assert_eq!(
        cache.backend_mut().take_calls(),
        vec![
            NativeCall::BindConstantBuffers {
                stage: ps,
                start: 2,
                buffers: vec![Some(b.native), Some(b.native)],
            },
            NativeCall::BindConstantBuffers {
                stage: ps,
                start: 7,
                buffers: vec![Some(b.native)],
            },
        ]
    );

    cache.set_constant_buffers(ps, 0, &desired).unwrap();
    assert!(cache.backend().calls().is_empty());
}

#[test]
fn single_slot_setters_skip_repeats() {
    let mut cache = cache();
    let raster = Bound::new(
        ResourceId::RasterState(RasterStateHandle::new(0, 1)),
        NativeHandle(1),
    );

    for _ in 0..3 {
        cache.set_topology(PrimitiveTopology::LineList);
        cache.set_viewport(Viewport::full(640, 480));
        cache.set_scissor(ScissorRect {
            x: 0,
            y: 0,
            width: 16,
            height: 16,
        });
        cache.set_raster_state(Some(raster));
    }

    assert_eq!(cache.backend().state_changes(), 4);

    cache.set_viewport(Viewport::full(640, 481));
    assert_eq!(cache.backend().state_changes(), 5);
}

#[test]
fn out_of_range_binds_change_nothing() {
    let mut cache = cache();

    match cache.set_shader_resources(ShaderStage::Pixel, 6, &[Some(srv(0)); 3]) {
        Err(Error::SlotOutOfRange {
            start,
            count,
            capacity,
        }) => assert_eq!((start, count, capacity), (6, 3, 8)),
        other => panic!("unexpected {:?}", other),
    }

    assert!(cache.set_vertex_buffers(8, &[VertexBufferBinding::default()]).is_err());
    assert!(cache.set_render_targets(&[None; 9], None).is_err());
    assert!(cache.backend().calls().is_empty());
    assert!(!cache.state().references(texture(0)));
}

/// After any sequence of binds, no texture is readable while it is a write target.
#[test]
fn hazards_never_survive() {
    let mut cache = cache();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..2000 {
        match rng.gen_range(0..3) {
            0 => {
                let stage = ShaderStage::ALL[rng.gen_range(0..2)];
                let start = rng.gen_range(0..8);
                let count = rng.gen_range(0..=8 - start);
                let views: Vec<_> = (0..count)
                    .map(|_| {
                        if rng.gen_bool(0.8) {
                            Some(srv(rng.gen_range(0..6)))
                        } else {
                            None
                        }
                    })
                    .collect();

                cache.set_shader_resources(stage, start, &views).unwrap();
            }
            1 => {
                let count = rng.gen_range(0..=3);
                let targets: Vec<_> = (0..count)
                    .map(|_| {
                        if rng.gen_bool(0.7) {
                            Some(rtv(rng.gen_range(0..6)))
                        } else {
                            None
                        }
                    })
                    .collect();

                let depth = if rng.gen_bool(0.3) {
                    Some(dsv(rng.gen_range(0..6)))
                } else {
                    None
                };

                cache.set_render_targets(&targets, depth).unwrap();
            }
            _ => {
                cache.on_texture_views_destroyed(texture(rng.gen_range(0..6)));
            }
        }

        let state = cache.state();
        for i in 0..6 {
            let t = texture(i);
            assert!(
                !(state.is_write_bound(t) && state.is_read_bound(t)),
                "{} is read and written at once",
                t
            );
        }
    }
}

/// After a resource is destroyed, no slot of any table refers to it.
#[test]
fn destroyed_resources_are_unbound_everywhere() {
    let mut cache = cache();
    let mut rng = StdRng::seed_from_u64(42);

    let sampler = |i: u32| {
        Bound::new(
            ResourceId::Sampler(SamplerHandle::new(i, 1)),
            NativeHandle(500 + u64::from(i)),
        )
    };

    for _ in 0..1000 {
        let stage = ShaderStage::ALL[rng.gen_range(0..2)];
        let slot = rng.gen_range(0..8);

        match rng.gen_range(0..8) {
            0 => {
                let b = VertexBufferBinding::new(buffer(rng.gen_range(0..4)), 16, 0);
                cache.set_vertex_buffers(slot, &[b]).unwrap();
            }
            1 => {
                let b = IndexBufferBinding {
                    buffer: buffer(rng.gen_range(0..4)),
                    format: IndexFormat::U16,
                    offset: 0,
                };
                cache.set_index_buffer(Some(b)).unwrap();
            }
            2 => {
                let b = buffer(rng.gen_range(0..4));
                cache.set_constant_buffers(stage, slot, &[Some(b)]).unwrap();
            }
            3 => {
                let s = sampler(rng.gen_range(0..4));
                cache.set_samplers(stage, slot, &[Some(s)]).unwrap();
            }
            4 => {
                let t = srv(rng.gen_range(0..4));
                cache.set_shader_resources(stage, slot, &[Some(t)]).unwrap();
            }
            5 => {
                let t = rng.gen_range(0..4);
                cache.set_render_targets(&[Some(rtv(t))], None).unwrap();
            }
            6 => {
                let resource = buffer(rng.gen_range(0..4)).resource;
                cache.on_buffer_destroyed(resource).unwrap();
                assert!(!cache.state().references(resource));
            }
            _ => {
                let i = rng.gen_range(0..4);
                let (t, s) = (texture(i), sampler(i).resource);
                cache.on_texture_views_destroyed(t);
                cache.on_sampler_destroyed(s);
                assert!(!cache.state().references(t));
                assert!(!cache.state().references(s));
            }
        }
    }
}

#[test]
fn mapped_buffers_can_not_be_rebound() {
    let mut cache = cache();
    let params = BufferParams::new(BufferKind::Vertex, BufferUsage::Dynamic, 64);
    let native = unsafe { cache.backend_mut().create_buffer(&params, None).unwrap() };
    let a = Bound::new(buffer(0).resource, native);

    cache
        .set_vertex_buffers(0, &[VertexBufferBinding::new(a, 16, 0)])
        .unwrap();
    cache.map_buffer(a, MapMode::WriteNoOverwrite).unwrap();
    cache.write_mapped(a, 60, &[9, 9, 9, 9]).unwrap();
    cache.backend_mut().take_calls();

    assert!(cache.set_vertex_buffers(0, &[VertexBufferBinding::default()]).is_err());
    assert!(cache.on_buffer_destroyed(a.resource).is_err());
    assert!(cache.backend().calls().is_empty());

    cache.unmap_buffer(a).unwrap();
    assert_eq!(&cache.backend().buffer_contents(native).unwrap()[60..], &[9, 9, 9, 9]);
    cache.on_buffer_destroyed(a.resource).unwrap();
    assert!(!cache.state().references(a.resource));
}
