//! Flat C interface
//!
//! Every call forwards to [`Environment`]. Errors are logged through
//! `tracing` and otherwise dropped; a null environment or string argument
//! makes a call do nothing (or return null). Strings returned by the dump
//! calls must be released with [`rulemancer_free_string`].

use crate::environment::Environment;
use std::ffi::{c_char, CStr, CString};
use tracing::warn;

/// Version of the C interface described by [`RulemancerApi`].
pub const RULEMANCER_ABI_VERSION: u32 = 1;

/// The C interface as a table of function pointers.
#[repr(C)]
pub struct RulemancerApi {
    pub abi_version: u32,
    pub create: extern "C" fn() -> *mut Environment,
    pub destroy: unsafe extern "C" fn(*mut Environment),
    pub load: unsafe extern "C" fn(*mut Environment, *const c_char),
    pub reset: unsafe extern "C" fn(*mut Environment),
    pub run: unsafe extern "C" fn(*mut Environment),
    pub assert_string: unsafe extern "C" fn(*mut Environment, *const c_char),
    pub dump_facts_by_relation:
        unsafe extern "C" fn(*mut Environment, *const c_char) -> *mut c_char,
    pub dump_facts: unsafe extern "C" fn(*mut Environment) -> *mut c_char,
    pub free_string: unsafe extern "C" fn(*mut Environment, *mut c_char),
}

static API: RulemancerApi = RulemancerApi {
    abi_version: RULEMANCER_ABI_VERSION,
    create: rulemancer_create,
    destroy: rulemancer_destroy,
    load: rulemancer_load,
    reset: rulemancer_reset,
    run: rulemancer_run,
    assert_string: rulemancer_assert,
    dump_facts_by_relation: rulemancer_dump_facts_by_relation,
    dump_facts: rulemancer_dump_facts,
    free_string: rulemancer_free_string,
};

/// Return the C ABI version supported by this library.
#[no_mangle]
pub extern "C" fn rulemancer_abi_version() -> u32 {
    RULEMANCER_ABI_VERSION
}

/// Return the function-pointer table. The table is static.
#[no_mangle]
pub extern "C" fn rulemancer_api() -> *const RulemancerApi {
    &API
}

/// Create an environment. Release it with [`rulemancer_destroy`].
#[no_mangle]
pub extern "C" fn rulemancer_create() -> *mut Environment {
    Box::into_raw(Box::new(Environment::new()))
}

/// Destroy an environment and every fact in it.
///
/// # Safety
/// `env` must come from [`rulemancer_create`] and not be used afterwards,
/// or be null.
#[no_mangle]
pub unsafe extern "C" fn rulemancer_destroy(env: *mut Environment) {
    if !env.is_null() {
        drop(Box::from_raw(env));
    }
}

/// Borrow a C string as UTF-8, logging why it cannot be.
unsafe fn str_arg<'a>(call: &str, arg: *const c_char) -> Option<&'a str> {
    if arg.is_null() {
        return None;
    }
    match CStr::from_ptr(arg).to_str() {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(call, error = %e, "argument is not valid UTF-8");
            None
        }
    }
}

/// Load a rule file.
///
/// # Safety
/// `env` must be a live environment or null; `path` a NUL-terminated string
/// or null.
#[no_mangle]
pub unsafe extern "C" fn rulemancer_load(env: *mut Environment, path: *const c_char) {
    let (Some(env), Some(path)) = (env.as_mut(), str_arg("load", path)) else {
        return;
    };
    if let Err(e) = env.load(path) {
        warn!(path, error = %e, "load failed");
    }
}

/// Empty working memory and assert the deffacts.
///
/// # Safety
/// `env` must be a live environment or null.
#[no_mangle]
pub unsafe extern "C" fn rulemancer_reset(env: *mut Environment) {
    let Some(env) = env.as_mut() else {
        return;
    };
    if let Err(e) = env.reset() {
        warn!(error = %e, "reset failed");
    }
}

/// Run to fixpoint.
///
/// # Safety
/// `env` must be a live environment or null.
#[no_mangle]
pub unsafe extern "C" fn rulemancer_run(env: *mut Environment) {
    let Some(env) = env.as_mut() else {
        return;
    };
    if let Err(e) = env.run(None) {
        warn!(error = %e, "run failed");
    }
}

/// Assert a fact written as text.
///
/// # Safety
/// `env` must be a live environment or null; `fact` a NUL-terminated string
/// or null.
#[no_mangle]
pub unsafe extern "C" fn rulemancer_assert(env: *mut Environment, fact: *const c_char) {
    let (Some(env), Some(fact)) = (env.as_mut(), str_arg("assert", fact)) else {
        return;
    };
    if let Err(e) = env.assert_string(fact) {
        warn!(fact, error = %e, "assert failed");
    }
}

fn into_c_string(text: Option<String>) -> *mut c_char {
    let Some(text) = text else {
        warn!("could not allocate fact dump");
        return std::ptr::null_mut();
    };
    match CString::new(text) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            warn!(error = %e, "fact dump contains a NUL byte");
            std::ptr::null_mut()
        }
    }
}

/// Pretty forms of the facts of `relation`, concatenated without separator.
///
/// # Safety
/// `env` must be a live environment or null; `relation` a NUL-terminated
/// string or null.
#[no_mangle]
pub unsafe extern "C" fn rulemancer_dump_facts_by_relation(
    env: *mut Environment,
    relation: *const c_char,
) -> *mut c_char {
    let (Some(env), Some(relation)) = (env.as_ref(), str_arg("dump_facts_by_relation", relation))
    else {
        return std::ptr::null_mut();
    };
    into_c_string(env.dump_facts_by_relation(relation))
}

/// Pretty forms of all facts, each followed by a newline.
///
/// # Safety
/// `env` must be a live environment or null.
#[no_mangle]
pub unsafe extern "C" fn rulemancer_dump_facts(env: *mut Environment) -> *mut c_char {
    let Some(env) = env.as_ref() else {
        return std::ptr::null_mut();
    };
    into_c_string(env.dump_facts())
}

/// Release a string returned by a dump call.
///
/// # Safety
/// `s` must come from a dump call of this library and not be released
/// before, or be null. `env` is accepted for symmetry and may be null.
#[no_mangle]
pub unsafe extern "C" fn rulemancer_free_string(_env: *mut Environment, s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
