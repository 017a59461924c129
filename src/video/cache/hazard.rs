//! Read/write hazards between shader resources and render targets.
//!
//! A texture must never be readable by a shader stage while it is bound as a
//! write target. Binding it as render target (or depth-stencil) wins: every
//! shader-resource slot holding it is unbound first, in all stages. Binding it
//! as shader resource while it is a write target binds null instead. Neither is
//! an error; a warning is logged when enabled.

use smallvec::SmallVec;

use super::ContextStateCache;
use crate::video::assets::prelude::*;
use crate::video::backends::Backend;
use crate::video::errors::Result;
use crate::video::{MAX_RENDER_TARGETS, MAX_SHADER_RESOURCES};

impl<B: Backend> ContextStateCache<B> {
    /// Binds shader-resource views of `stage` starting at slot `start`.
    ///
    /// Views of a resource that is currently bound as write target are replaced
    /// with null.
    pub fn set_shader_resources(
        &mut self,
        stage: ShaderStage,
        start: usize,
        views: &[Option<Bound>],
    ) -> Result<()> {
        self.state.shader_resources[stage.index()].check_range(start, views.len())?;

        let mut filtered: SmallVec<[Option<Bound>; MAX_SHADER_RESOURCES]> = SmallVec::new();
        for (i, v) in views.iter().enumerate() {
            match *v {
                Some(b) if self.state.is_write_bound(b.resource) => {
                    if self.warn_on_hazard {
                        warn!(
                            "{} is bound as write target, binding null to {:?} shader resource {} instead.",
                            b.resource,
                            stage,
                            start + i
                        );
                    }

                    filtered.push(None);
                }
                other => filtered.push(other),
            }
        }

        self.commit_shader_resources(stage, start, &filtered);
        Ok(())
    }

    /// Force-unbinds every shader-resource slot, in any stage, holding one of
    /// `resources`. Must run before those resources get bound as write targets.
    pub fn resolve_write_hazard(&mut self, resources: &[ResourceId]) {
        if resources.is_empty() {
            return;
        }

        for &stage in ShaderStage::ALL.iter() {
            let table = &self.state.shader_resources[stage.index()];
            if let Some(desired) = table.without_any(resources) {
                if self.warn_on_hazard {
                    for (slot, v) in table.as_slice().iter().enumerate() {
                        if let Some(b) = *v {
                            if resources.contains(&b.resource) {
                                warn!(
                                    "{} is going to be written, unbinding it from {:?} shader resource {}.",
                                    b.resource, stage, slot
                                );
                            }
                        }
                    }
                }

                self.commit_shader_resources(stage, 0, &desired);
            }
        }
    }

    /// Binds the render targets and the depth-stencil target.
    ///
    /// Slots past `targets.len()` are bound to null. Conflicting shader-resource
    /// slots are unbound first, then the whole output binding is committed in one
    /// native call if anything differs from the cache. Native APIs only accept the
    /// output binding as a whole table with the depth target, so coalescing
    /// changed runs buys nothing here.
    pub fn set_render_targets(
        &mut self,
        targets: &[Option<Bound>],
        depth_stencil: Option<Bound>,
    ) -> Result<()> {
        self.state.render_targets.check_range(0, targets.len())?;

        let mut desired = [None; MAX_RENDER_TARGETS];
        desired[..targets.len()].copy_from_slice(targets);

        if self.state.render_targets.as_slice() == &desired[..]
            && self.state.depth_stencil == depth_stencil
        {
            return Ok(());
        }

        let writes: SmallVec<[ResourceId; MAX_RENDER_TARGETS + 1]> = desired
            .iter()
            .chain(Some(&depth_stencil))
            .filter_map(|v| v.map(|v| v.resource))
            .collect();

        self.resolve_write_hazard(&writes);
        self.commit_render_targets(&desired, depth_stencil);
        Ok(())
    }

    pub(super) fn commit_shader_resources(
        &mut self,
        stage: ShaderStage,
        start: usize,
        views: &[Option<Bound>],
    ) {
        let table = &mut self.state.shader_resources[stage.index()];
        for run in table.update_range(start, views) {
            unsafe {
                self.backend
                    .bind_shader_resources(stage, run.start, table.run(run))
            };
        }
    }

    /// The output binding of a native context is one piece of state, so it is
    /// always committed as a whole.
    pub(super) fn commit_render_targets(
        &mut self,
        targets: &[Option<Bound>],
        depth_stencil: Option<Bound>,
    ) {
        self.state.render_targets.update_range(0, targets);
        self.state.depth_stencil = depth_stencil;

        unsafe {
            self.backend
                .bind_render_targets(self.state.render_targets.as_slice(), depth_stencil)
        };
    }
}

#[cfg(test)]
mod test {
    use crate::utils::handle::HandleLike;
    use crate::video::assets::prelude::*;
    use crate::video::backends::record::{NativeCall, RecordingBackend};
    use crate::video::cache::ContextStateCache;
    use crate::video::settings::ContextParams;

    fn srv(i: u32) -> Bound {
        Bound::new(
            ResourceId::Texture(TextureHandle::new(i, 1)),
            NativeHandle(10 + u64::from(i)),
        )
    }

    fn rtv(i: u32) -> Bound {
        Bound::new(
            ResourceId::Texture(TextureHandle::new(i, 1)),
            NativeHandle(20 + u64::from(i)),
        )
    }

    fn cache() -> ContextStateCache<RecordingBackend> {
        ContextStateCache::new(RecordingBackend::new(), &ContextParams::default())
    }

    #[test]
    fn render_target_unbinds_reads_first() {
        let mut cache = cache();
        cache.set_shader_resources(ShaderStage::Pixel, 0, &[Some(srv(0)), Some(srv(1))]).unwrap();
        cache.set_shader_resources(ShaderStage::Vertex, 3, &[Some(srv(1))]).unwrap();
        cache.backend_mut().take_calls();

        cache.set_render_targets(&[Some(rtv(1))], None).unwrap();
        let calls = cache.backend_mut().take_calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[0],
            NativeCall::BindShaderResources {
                stage: ShaderStage::Vertex,
                start: 3,
                views: vec![None],
            }
        );
        assert_eq!(
            calls[1],
            NativeCall::BindShaderResources {
                stage: ShaderStage::Pixel,
                start: 1,
                views: vec![None],
            }
        );
        match calls[2] {
            NativeCall::BindRenderTargets { ref targets, depth_stencil } => {
                assert_eq!(targets.len(), 8);
                assert_eq!(targets[0], Some(NativeHandle(21)));
                assert_eq!(depth_stencil, None);
            }
            ref other => panic!("unexpected {:?}", other),
        }

        assert_eq!(cache.state().shader_resources(ShaderStage::Pixel)[0], Some(srv(0)));
        assert!(!cache.state().is_read_bound(rtv(1).resource));
    }

    #[test]
    fn shader_resource_of_write_target_binds_null() {
        let mut cache = cache();
        cache.set_render_targets(&[], Some(rtv(4))).unwrap();
        cache.backend_mut().take_calls();

        cache.set_shader_resources(ShaderStage::Pixel, 0, &[Some(srv(4)), Some(srv(5))]).unwrap();
        assert_eq!(
            cache.backend().calls(),
            &[NativeCall::BindShaderResources {
                stage: ShaderStage::Pixel,
                start: 1,
                views: vec![Some(NativeHandle(15))],
            }]
        );
    }

    #[test]
    fn unchanged_render_targets_are_free() {
        let mut cache = cache();
        cache.set_render_targets(&[Some(rtv(0)), None], Some(rtv(1))).unwrap();
        cache.backend_mut().take_calls();

        cache.set_render_targets(&[Some(rtv(0))], Some(rtv(1))).unwrap();
        assert!(cache.backend().calls().is_empty());

        // Dropping a target above slot 0 still commits the whole binding.
        cache.set_render_targets(&[Some(rtv(0)), Some(rtv(2))], Some(rtv(1))).unwrap();
        cache.set_render_targets(&[Some(rtv(0))], Some(rtv(1))).unwrap();
        assert_eq!(cache.backend().state_changes(), 2);
        assert_eq!(cache.state().render_targets()[1], None);

        assert!(cache.set_render_targets(&[None; 9], None).is_err());
    }
}
