#![allow(dead_code)]

use tracing_subscriber::{fmt, EnvFilter};
use udf_registry::context::AnalysisContext;
use udf_registry::error::Result;
use udf_registry::fndef::FnDef;
use udf_registry::helpers::expr::{NodeManager, WindowDef};
use udf_registry::helpers::types::DataType;
use udf_registry::SealedUdfLibrary;

/// Route resolution traces to the test output
pub fn init_test_logging() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Resolves `name` over fresh arguments of the given types (None is unknown)
/// and returns the definition of the produced call
pub fn resolve(
    library: &SealedUdfLibrary,
    name: &str,
    arg_types: &[Option<DataType>],
    over: Option<&WindowDef>,
) -> Result<FnDef> {
    let mut nm = NodeManager::new();
    let args = arg_types
        .iter()
        .enumerate()
        .map(|(idx, typ)| nm.make_typed_expr_id(format!("arg_{}", idx), typ.clone()))
        .collect::<Vec<_>>();
    let mut ctx = AnalysisContext::new(&mut nm);
    let call = library.transform(name, &args, over, &mut ctx)?;
    let node = nm.get(call).expect("transform returns a node");
    assert_eq!(node.call_args(), Some(args.as_slice()));
    Ok(node.fn_def().expect("transform returns a call").clone())
}
