extern crate env_logger;
extern crate gpucache;

use gpucache::cgmath::{Matrix4, Vector4};
use gpucache::prelude::*;
use gpucache::video::context::FrameTargetObject;
use gpucache::video::errors::Error;

struct Fixture {
    ctx: Context<RecordingBackend>,
    color: TextureHandle,
    depth: TextureHandle,
    target: FrameTargetHandle,
    program: ProgramHandle,
}

fn fixture() -> Fixture {
    let _ = env_logger::try_init();
    let mut ctx = Context::new(RecordingBackend::new(), ContextParams::default()).unwrap();

    let mut params = TextureParams::default();
    params.usage = TextureUsage::render_target();
    params.dimensions = Vector2::new(320, 240);
    let color = ctx.create_texture(params, None).unwrap();

    params.format = TextureFormat::Depth24Stencil8;
    params.usage = TextureUsage::depth_stencil();
    let depth = ctx.create_texture(params, None).unwrap();

    let target = ctx
        .create_frame_target(
            FrameTargetParams::new()
                .with_color(0, color)
                .with_depth_stencil(depth),
        )
        .unwrap();

    let vs = ctx.create_shader(ShaderStage::Vertex, "void main() {}").unwrap();
    let ps = ctx.create_shader(ShaderStage::Pixel, "void main() {}").unwrap();
    let program = ctx.create_program(vs, ps).unwrap();

    ctx.backend_mut().take_calls();
    Fixture {
        ctx,
        color,
        depth,
        target,
        program,
    }
}

fn draw(f: &mut Fixture, topology: PrimitiveTopology, vertices: u32, instances: u32) {
    let mut dc = DrawCall::new(f.program);
    dc.set_topology(topology).draw(vertices, 0, instances);
    f.ctx.execute_draw_call(&dc, f.target, None, None).unwrap();
}

#[test]
fn primitive_statistics() {
    let mut f = fixture();

    draw(&mut f, PrimitiveTopology::TriangleList, 9, 2);
    assert_eq!(f.ctx.statistics().primitives, 6);

    draw(&mut f, PrimitiveTopology::TriangleStrip, 5, 1);
    assert_eq!(f.ctx.statistics().primitives, 6 + 3);

    draw(&mut f, PrimitiveTopology::LineStrip, 4, 1);
    assert_eq!(f.ctx.statistics().primitives, 6 + 3 + 3);

    draw(&mut f, PrimitiveTopology::TriangleStrip, 1, 1);
    draw(&mut f, PrimitiveTopology::PointList, 7, 1);

    let stats = f.ctx.advance();
    assert_eq!(stats.draw_calls, 5);
    assert_eq!(stats.primitives, 6 + 3 + 3 + 0 + 7);
    assert_eq!(f.ctx.advance(), FrameStatistics::default());
}

#[test]
fn draw_commits_full_state_once() {
    let mut f = fixture();

    let layout = f
        .ctx
        .create_input_layout(
            InputLayoutParams::new()
                .with(0, VertexFormat::Float3, 0, 0)
                .with(1, VertexFormat::Float2, 1, 0),
        )
        .unwrap();

    let positions = f
        .ctx
        .create_buffer(
            BufferParams::new(BufferKind::Vertex, BufferUsage::Immutable, 36),
            Some(&[0; 36]),
        )
        .unwrap();
    let uvs = f
        .ctx
        .create_buffer(
            BufferParams::new(BufferKind::Vertex, BufferUsage::Immutable, 24),
            Some(&[0; 24]),
        )
        .unwrap();
    let indices = f
        .ctx
        .create_buffer(
            BufferParams::new(BufferKind::Index, BufferUsage::Immutable, 6),
            Some(&[0, 0, 1, 0, 2, 0]),
        )
        .unwrap();

    let mut dc = DrawCall::new(f.program);
    dc.set_topology(PrimitiveTopology::TriangleList)
        .set_input_layout(layout)
        .set_vertex_buffer(0, positions, 12, 0)
        .set_vertex_buffer(1, uvs, 8, 0)
        .set_index_buffer(indices, IndexFormat::U16, 0)
        .set_blend_state(f.ctx.default_blend_state())
        .draw_indexed(3, 0, 0, 1);

    f.ctx.backend_mut().take_calls();
    f.ctx.execute_draw_call(&dc, f.target, None, None).unwrap();
    let calls = f.ctx.backend_mut().take_calls();

    let vbs: Vec<_> = calls
        .iter()
        .filter(|v| match **v {
            NativeCall::BindVertexBuffers { .. } => true,
            _ => false,
        })
        .collect();
    assert_eq!(vbs.len(), 1);

    assert_eq!(calls.iter().filter(|v| v.is_draw()).count(), 1);
    match calls.last() {
        Some(NativeCall::DrawIndexed { indices: 3, .. }) => {}
        other => panic!("unexpected {:?}", other),
    }

    let state = f.ctx.cache().state();
    assert_eq!(state.render_targets()[0].map(|v| v.resource), Some(ResourceId::Texture(f.color)));
    assert_eq!(state.depth_stencil().map(|v| v.resource), Some(ResourceId::Texture(f.depth)));
    assert_eq!(state.index_buffer().map(|v| v.format), Some(IndexFormat::U16));
    assert_eq!(state.vertex_buffers()[1].stride, 8);

    f.ctx.execute_draw_call(&dc, f.target, None, None).unwrap();
    assert_eq!(f.ctx.backend().calls().len(), 1);

    // Dropping the second stream unbinds slot 1 only.
    let mut dc2 = DrawCall::new(f.program);
    dc2.set_topology(PrimitiveTopology::TriangleList)
        .set_input_layout(layout)
        .set_vertex_buffer(0, positions, 12, 0)
        .draw(3, 0, 1);

    f.ctx.backend_mut().take_calls();
    f.ctx.execute_draw_call(&dc2, f.target, None, None).unwrap();
    let calls = f.ctx.backend_mut().take_calls();
    assert!(calls.contains(&NativeCall::BindVertexBuffers {
        start: 1,
        buffers: vec![None],
        strides: vec![0],
        offsets: vec![0],
    }));
    assert!(calls.contains(&NativeCall::BindIndexBuffer(None)));
}

#[test]
fn sampling_the_bound_target_reads_null() {
    let mut f = fixture();
    let sampler = f.ctx.create_sampler(SamplerParams::default()).unwrap();

    let mut dc = DrawCall::new(f.program);
    dc.set_topology(PrimitiveTopology::TriangleList)
        .set_uniform(BoundUniform::Texture {
            stage: ShaderStage::Pixel,
            slot: 2,
            texture: f.color,
        })
        .set_uniform(BoundUniform::Sampler {
            stage: ShaderStage::Pixel,
            slot: 2,
            sampler,
        })
        .draw(3, 0, 1);

    f.ctx.execute_draw_call(&dc, f.target, None, None).unwrap();

    let state = f.ctx.cache().state();
    assert_eq!(state.shader_resources(ShaderStage::Pixel)[2], None);
    assert!(state.samplers(ShaderStage::Pixel)[2].is_some());
    assert!(state.is_write_bound(ResourceId::Texture(f.color)));

    // Into another target, the texture is readable again.
    let mut params = TextureParams::default();
    params.usage = TextureUsage::render_target();
    params.dimensions = Vector2::new(16, 16);
    let other = f.ctx.create_texture(params, None).unwrap();
    let other = f
        .ctx
        .create_frame_target(FrameTargetParams::new().with_color(0, other))
        .unwrap();

    f.ctx.execute_draw_call(&dc, other, None, None).unwrap();
    let state = f.ctx.cache().state();
    assert!(state.is_read_bound(ResourceId::Texture(f.color)));
    assert!(!state.is_write_bound(ResourceId::Texture(f.color)));
    assert_eq!(state.viewport(), Some(Viewport::full(16, 16)));
}

#[test]
fn numeric_uniforms_per_stage() {
    let mut f = fixture();
    let mvp = Matrix4::from_scale(2.0);

    let mut dc = DrawCall::new(f.program);
    dc.set_topology(PrimitiveTopology::TriangleList)
        .set_uniform(BoundUniform::Numeric {
            stage: ShaderStage::Vertex,
            byte_offset: 0,
            value: UniformValue::Matrix4(mvp),
        })
        .set_uniform(BoundUniform::Numeric {
            stage: ShaderStage::Pixel,
            byte_offset: 32,
            value: UniformValue::Vector4(Vector4::new(1.0, 0.5, 0.25, 1.0)),
        })
        .draw(3, 0, 1);

    f.ctx.execute_draw_call(&dc, f.target, None, None).unwrap();

    let native = |f: &Fixture, stage| {
        let h = f.ctx.global_uniforms(stage).unwrap();
        f.ctx.buffer(h).unwrap().native
    };

    let vs = native(&f, ShaderStage::Vertex);
    let bytes = f.ctx.backend().buffer_contents(vs).unwrap();
    assert_eq!(&bytes[0..4], &2.0f32.to_ne_bytes());
    assert_eq!(&bytes[20..24], &2.0f32.to_ne_bytes());
    assert_eq!(&bytes[60..64], &1.0f32.to_ne_bytes());

    let ps = native(&f, ShaderStage::Pixel);
    let bytes = f.ctx.backend().buffer_contents(ps).unwrap();
    assert_eq!(&bytes[36..40], &0.5f32.to_ne_bytes());

    // Every draw rewrites the implicit buffers, but never rebinds them.
    f.ctx.backend_mut().take_calls();
    f.ctx.execute_draw_call(&dc, f.target, None, None).unwrap();
    assert_eq!(f.ctx.backend().state_changes(), 0);
}

#[test]
fn scissor_and_viewport() {
    let mut f = fixture();
    let mut desc = RasterDesc::default();
    desc.scissor = true;
    let raster = f.ctx.create_raster_state(desc).unwrap();

    let mut dc = DrawCall::new(f.program);
    dc.set_topology(PrimitiveTopology::TriangleList)
        .set_raster_state(raster)
        .draw(3, 0, 1);

    f.ctx.backend_mut().take_calls();
    match f.ctx.execute_draw_call(&dc, f.target, None, None) {
        Err(Error::MissingScissor) => {}
        other => panic!("unexpected {:?}", other),
    }
    assert!(f.ctx.backend().calls().is_empty());

    let scissor = ScissorRect {
        x: 8,
        y: 8,
        width: 32,
        height: 32,
    };
    let viewport = Viewport::full(100, 100);
    f.ctx
        .execute_draw_call(&dc, f.target, Some(viewport), Some(scissor))
        .unwrap();

    let calls = f.ctx.backend().calls();
    assert!(calls.contains(&NativeCall::SetScissor(scissor)));
    assert!(calls.contains(&NativeCall::SetViewport(viewport)));
    assert_eq!(f.ctx.cache().state().raster_state().map(|v| v.resource), Some(ResourceId::RasterState(raster)));
}

#[test]
fn clears_go_straight_to_the_backend() {
    let mut f = fixture();
    f.ctx.clear_color(f.target, None, [0.0, 0.0, 0.0, 1.0]).unwrap();
    f.ctx.clear_depth(f.target, 1.0).unwrap();
    assert!(f.ctx.clear_color(f.target, Some(3), [0.0; 4]).is_err());

    let calls = f.ctx.backend_mut().take_calls();
    assert_eq!(calls.len(), 2);
    match (&calls[0], &calls[1]) {
        (NativeCall::ClearRenderTarget(_, c), NativeCall::ClearDepthStencil(_, d)) => {
            assert_eq!(c[3], 1.0);
            assert_eq!(*d, 1.0);
        }
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(f.ctx.backend().state_changes(), 0);
}

#[test]
fn deleting_bound_resources() {
    let mut f = fixture();
    let vb = f
        .ctx
        .create_buffer(
            BufferParams::new(BufferKind::Vertex, BufferUsage::Dynamic, 48),
            None,
        )
        .unwrap();

    let mut dc = DrawCall::new(f.program);
    dc.set_topology(PrimitiveTopology::TriangleList)
        .set_vertex_buffer(3, vb, 16, 0)
        .draw(3, 0, 1);
    f.ctx.execute_draw_call(&dc, f.target, None, None).unwrap();
    f.ctx.backend_mut().take_calls();

    f.ctx.map_buffer(vb, MapMode::WriteDiscard).unwrap();
    match f.ctx.delete_buffer(vb) {
        Err(Error::BufferMapped(r)) => assert_eq!(r, ResourceId::Buffer(vb)),
        other => panic!("unexpected {:?}", other),
    }

    f.ctx.unmap_buffer(vb).unwrap();
    f.ctx.backend_mut().take_calls();
    f.ctx.delete_buffer(vb).unwrap();

    let calls = f.ctx.backend_mut().take_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0],
        NativeCall::BindVertexBuffers {
            start: 3,
            buffers: vec![None],
            strides: vec![0],
            offsets: vec![0],
        }
    );
    assert!(!f.ctx.cache().state().references(ResourceId::Buffer(vb)));
    assert!(f.ctx.buffer(vb).is_none());
    assert!(f.ctx.delete_buffer(vb).is_err());

    match f.ctx.execute_draw_call(&dc, f.target, None, None) {
        Err(Error::BufferHandleInvalid(h)) => assert_eq!(h, vb),
        other => panic!("unexpected {:?}", other),
    }

    f.ctx.delete_texture(f.depth).unwrap();
    assert_eq!(f.ctx.cache().state().depth_stencil(), None);
    let ft: &FrameTargetObject = f.ctx.frame_target(f.target).unwrap();
    assert_eq!(ft.params.depth_stencil, Some(f.depth));
}

#[test]
fn creation_failures_leave_no_handles() {
    let mut f = fixture();
    f.ctx.backend_mut().set_fail_creation(true);

    let params = BufferParams::new(BufferKind::Constant, BufferUsage::Dynamic, 16);
    assert!(f.ctx.create_buffer(params, None).is_err());
    assert!(f.ctx.create_sampler(SamplerParams::default()).is_err());
    assert!(f.ctx.create_shader(ShaderStage::Vertex, "").is_err());

    f.ctx.backend_mut().set_fail_creation(false);
    let b = f.ctx.create_buffer(params, None).unwrap();
    assert!(f.ctx.buffer(b).is_some());

    let vs = f.ctx.create_shader(ShaderStage::Vertex, "void main() {}").unwrap();
    assert!(f.ctx.create_program(vs, vs).is_err());
}

#[test]
fn headless_context() {
    let _ = env_logger::try_init();
    let params = ContextParams::from_json(r#"{ "global_uniforms_size": 256 }"#).unwrap();
    assert_eq!(params.global_uniforms_size, 256);

    let mut ctx = Context::new(HeadlessBackend::new(), params).unwrap();
    let mut tp = TextureParams::default();
    tp.usage = TextureUsage::render_target();
    tp.dimensions = Vector2::new(4, 4);
    let color = ctx.create_texture(tp, None).unwrap();
    let target = ctx
        .create_frame_target(FrameTargetParams::new().with_color(0, color))
        .unwrap();

    let vs = ctx.create_shader(ShaderStage::Vertex, "").unwrap();
    let ps = ctx.create_shader(ShaderStage::Pixel, "").unwrap();
    let program = ctx.create_program(vs, ps).unwrap();

    let mut dc = DrawCall::new(program);
    dc.set_topology(PrimitiveTopology::TriangleList)
        .set_uniform(BoundUniform::Numeric {
            stage: ShaderStage::Vertex,
            byte_offset: 240,
            value: UniformValue::Vector4(Vector4::new(0.0, 0.0, 0.0, 0.0)),
        })
        .draw(6, 0, 1);

    ctx.execute_draw_call(&dc, target, None, None).unwrap();
    assert_eq!(ctx.advance().primitives, 2);

    let params = ContextParams {
        global_uniforms_size: 100,
        ..ContextParams::default()
    };
    assert!(Context::new(HeadlessBackend::new(), params).is_err());
}

#[test]
fn occlusion_query_around_draws() {
    let mut f = fixture();
    let q = f.ctx.create_query(QueryKind::AnySamplesPassed).unwrap();
    let native = f.ctx.query(q).unwrap().native;

    f.ctx.begin_query(q).unwrap();
    draw(&mut f, PrimitiveTopology::TriangleList, 3, 1);
    f.ctx.end_query(q).unwrap();
    assert_eq!(f.ctx.query_result(q).unwrap(), None);

    let calls = f.ctx.backend_mut().take_calls();
    let begin = calls.iter().position(|v| *v == NativeCall::BeginQuery(native));
    let draw_at = calls.iter().position(|v| v.is_draw());
    let end = calls.iter().position(|v| *v == NativeCall::EndQuery(native));
    assert!(begin.is_some() && begin < draw_at && draw_at < end);

    f.ctx.backend_mut().set_query_result(Some(1));
    assert!(f.ctx.is_query_ready(q).unwrap());

    // Restarting discards the previous result until it ends again.
    f.ctx.begin_query(q).unwrap();
    assert!(f.ctx.query_result(q).is_err());
    f.ctx.end_query(q).unwrap();
    f.ctx.delete_query(q).unwrap();
    assert!(f.ctx.query(q).is_none());
}
