//! Module setup for the built-in runtime
//!
//! Registers two modules:
//! - the root numeric module (array construction, arithmetic, lcm/gcd)
//! - `random` (sampling), also reachable as the root module's `random`
//!   attribute so dotted paths like `random.rand` resolve either way

use std::collections::HashMap;

use crate::runtime::ObjId;
use crate::vm::Engine;
use crate::vm::value::{Module, NativeFn, NativeFunction, Object};

pub fn setup_stdlib(engine: &mut Engine, root: &str) {
    let random = setup_random(engine);
    let numeric = setup_numeric(engine, root, random);
    engine.register_module(root, numeric);
    engine.register_module("random", random);
    // Dotted form as well, so `import("<root>.random")` works.
    engine.retain(random);
    engine.register_module(&format!("{root}.random"), random);
}

fn register_native(
    engine: &mut Engine,
    attrs: &mut HashMap<String, ObjId>,
    name: &'static str,
    func: NativeFn,
) {
    let id = engine.alloc(Object::Native(NativeFunction { name, func }));
    attrs.insert(name.to_string(), id);
}

fn setup_numeric(engine: &mut Engine, root: &str, random: ObjId) -> ObjId {
    use crate::stdlib::{
        native_add, native_arange, native_array, native_asarray, native_copy, native_full,
        native_gcd, native_lcm, native_multiply, native_ones, native_reshape, native_subtract,
        native_sum, native_zeros,
    };

    let mut attrs = HashMap::new();
    register_native(engine, &mut attrs, "array", native_array);
    register_native(engine, &mut attrs, "asarray", native_asarray);
    register_native(engine, &mut attrs, "arange", native_arange);
    register_native(engine, &mut attrs, "zeros", native_zeros);
    register_native(engine, &mut attrs, "ones", native_ones);
    register_native(engine, &mut attrs, "full", native_full);
    register_native(engine, &mut attrs, "reshape", native_reshape);
    register_native(engine, &mut attrs, "copy", native_copy);
    register_native(engine, &mut attrs, "sum", native_sum);
    register_native(engine, &mut attrs, "add", native_add);
    register_native(engine, &mut attrs, "subtract", native_subtract);
    register_native(engine, &mut attrs, "multiply", native_multiply);
    register_native(engine, &mut attrs, "lcm", native_lcm);
    register_native(engine, &mut attrs, "gcd", native_gcd);

    let none = engine.new_none();
    attrs.insert("newaxis".to_string(), none);
    engine.retain(random);
    attrs.insert("random".to_string(), random);

    engine.alloc(Object::Module(Module {
        name: root.to_string(),
        attrs,
    }))
}

fn setup_random(engine: &mut Engine) -> ObjId {
    use crate::stdlib::random::{
        native_bytes, native_choice, native_normal, native_permutation, native_rand,
        native_randint, native_randn, native_random_integers, native_random_sample, native_seed,
        native_shuffle, native_uniform,
    };

    let mut attrs = HashMap::new();
    register_native(engine, &mut attrs, "seed", native_seed);
    register_native(engine, &mut attrs, "rand", native_rand);
    register_native(engine, &mut attrs, "randn", native_randn);
    register_native(engine, &mut attrs, "randint", native_randint);
    register_native(engine, &mut attrs, "random_integers", native_random_integers);
    register_native(engine, &mut attrs, "choice", native_choice);
    register_native(engine, &mut attrs, "bytes", native_bytes);
    register_native(engine, &mut attrs, "shuffle", native_shuffle);
    register_native(engine, &mut attrs, "permutation", native_permutation);
    register_native(engine, &mut attrs, "uniform", native_uniform);
    register_native(engine, &mut attrs, "normal", native_normal);

    // Four names for the same sampler.
    for alias in ["random_sample", "random", "ranf", "sample"] {
        register_native(engine, &mut attrs, alias, native_random_sample);
    }

    engine.alloc(Object::Module(Module {
        name: "random".to_string(),
        attrs,
    }))
}
