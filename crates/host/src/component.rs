//! wasmtime-backed guest.

use std::path::Path;

use tracing::debug;
use value::{EvaluationRequest, EvaluationResultContext};
use wasmtime::component::{Component, ComponentExportIndex, Func, Instance, Linker, Val};
use wasmtime::{Config, Engine, Store};

use crate::guest::{GuestComponent, GuestExports, GuestInstance};
use crate::{CapabilityProvider, Error, Result, linker, marshal};

/// Interface the guest exports its entry points under.
pub const ENGINE_INTERFACE: &str = "sandbox:policy/engine";

pub(crate) fn engine() -> wasmtime::Result<Engine> {
    let mut config = Config::new();
    config.wasm_component_model(true);
    Engine::new(&config)
}

/// A compiled guest component.
#[derive(Clone)]
pub struct WasmComponent {
    engine: Engine,
    component: Component,
}

impl WasmComponent {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading guest component");
        let bytes = std::fs::read(path)?;
        Self::from_binary(&bytes)
    }

    /// Compile a component from its binary (or text) form.
    pub fn from_binary(bytes: &[u8]) -> Result<Self> {
        let engine = engine().map_err(Error::instantiation)?;
        let component = Component::new(&engine, bytes).map_err(Error::instantiation)?;
        Ok(Self { engine, component })
    }
}

impl std::fmt::Debug for WasmComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmComponent").finish_non_exhaustive()
    }
}

impl GuestComponent for WasmComponent {
    type Instance = WasmInstance;

    fn instantiate(&self, provider: CapabilityProvider) -> Result<WasmInstance> {
        let mut linker = Linker::new(&self.engine);
        linker::add_to_linker(&mut linker).map_err(Error::instantiation)?;

        let mut store = Store::new(&self.engine, provider);
        let instance = linker
            .instantiate(&mut store, &self.component)
            .map_err(Error::instantiation)?;

        Ok(WasmInstance {
            store,
            instance,
            component: self.component.clone(),
        })
    }
}

pub struct WasmInstance {
    store: Store<CapabilityProvider>,
    instance: Instance,
    component: Component,
}

impl WasmInstance {
    fn export_index(
        &self,
        parent: Option<&ComponentExportIndex>,
        name: &str,
    ) -> Result<ComponentExportIndex> {
        self.component
            .export_index(parent, name)
            .map(|(_, index)| index)
            .ok_or_else(|| Error::Binding(name.to_string()))
    }

    fn func(&mut self, interface: &ComponentExportIndex, name: &str) -> Result<Func> {
        let index = self.export_index(Some(interface), name)?;
        self.instance
            .get_func(&mut self.store, &index)
            .ok_or_else(|| Error::Binding(format!("{ENGINE_INTERFACE}#{name} is not a function")))
    }
}

impl GuestInstance for WasmInstance {
    type Exports = WasmExports;

    fn bind(mut self) -> Result<WasmExports> {
        let interface = self.export_index(None, ENGINE_INTERFACE)?;
        let version = self.func(&interface, "version")?;
        let eval = self.func(&interface, "eval")?;
        Ok(WasmExports {
            store: self.store,
            version,
            eval,
        })
    }
}

pub struct WasmExports {
    store: Store<CapabilityProvider>,
    version: Func,
    eval: Func,
}

impl WasmExports {
    fn call(&mut self, func: Func, params: &[Val]) -> Result<Val> {
        let mut results = [Val::Bool(false)];
        func.call(&mut self.store, params, &mut results)
            .map_err(call_error)?;
        func.post_return(&mut self.store).map_err(Error::trap)?;
        let [result] = results;
        Ok(result)
    }
}

impl GuestExports for WasmExports {
    fn version(&mut self) -> Result<String> {
        match self.call(self.version, &[])? {
            Val::String(version) => Ok(version),
            other => Err(Error::wire(format!("version returned {other:?}"))),
        }
    }

    fn eval(
        &mut self,
        request: &EvaluationRequest,
    ) -> Result<std::result::Result<EvaluationResultContext, String>> {
        let result = self.call(self.eval, &marshal::eval_params(request))?;
        match marshal::lift_eval_result(&result)? {
            Ok(encoded) => Ok(Ok(EvaluationResultContext::decode(encoded)?)),
            Err(message) => Ok(Err(message)),
        }
    }
}

/// Recover a host error raised inside an import, otherwise report a trap.
fn call_error(error: wasmtime::Error) -> Error {
    match error.downcast::<Error>() {
        Ok(host) => host,
        Err(error) => Error::trap(error),
    }
}
