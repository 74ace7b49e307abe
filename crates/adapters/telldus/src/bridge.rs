//! Native binding bridge over a dynamically loaded C library.
//!
//! Entry points are looked up by name on first use and remembered in a
//! per-library cache. Each supported C signature has its own typed call
//! shape, named after the return and parameter kinds: `ri_pii` returns an
//! `int` and takes two `int`s, `rs_piss` returns a string and takes an `int`
//! and two strings, and so on.
//!
//! Strings returned by the library are copied and then handed back to the
//! library's release function; they are never freed by Rust.
//!
//! ## Failure modes
//!
//! - A library that cannot be loaded is remembered as unavailable. Calling
//!   through it panics: the daemon refuses to start in that state, so
//!   reaching such a call is a wiring bug.
//! - A symbol that cannot be resolved in a loaded library means the library
//!   is incompatible. This also panics, naming the symbol.

#![allow(unsafe_code)]

use std::collections::HashMap;
use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::sync::{Mutex, OnceLock, PoisonError};

use libloading::Library;

/// Name of telldus-core's string release function.
pub const TELLDUS_RELEASE_SYMBOL: &str = "tdReleaseString";

/// Library names tried, in order, when no explicit path is configured.
#[cfg(target_os = "windows")]
pub const DEFAULT_LIBRARY_NAMES: &[&str] = &["TelldusCore.dll"];

#[cfg(target_os = "macos")]
pub const DEFAULT_LIBRARY_NAMES: &[&str] =
    &["/Library/Frameworks/TelldusCore.framework/TelldusCore"];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const DEFAULT_LIBRARY_NAMES: &[&str] = &["libtelldus-core.so.2", "libtelldus-core.so"];

/// Errors surfaced by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The shared library could not be loaded.
    #[error("unable to load library {path}: {reason}")]
    Unavailable { path: String, reason: String },

    /// A string argument cannot be passed to C.
    #[error("string {0:?} contains an interior NUL byte")]
    InteriorNul(String),
}

/// Raw address of a resolved symbol.
#[derive(Clone, Copy)]
struct SymbolAddr(*mut c_void);

// SAFETY: the address points into a library that is never unloaded while a
// `NativeLibrary` exists; the address itself carries no thread affinity.
unsafe impl Send for SymbolAddr {}
// SAFETY: see above, the address is only copied out and called through.
unsafe impl Sync for SymbolAddr {}

type Rv = unsafe extern "system" fn();
type Ri = unsafe extern "system" fn() -> c_int;
type Rs = unsafe extern "system" fn() -> *mut c_char;
type RiPi = unsafe extern "system" fn(c_int) -> c_int;
type RiPii = unsafe extern "system" fn(c_int, c_int) -> c_int;
type RiPs = unsafe extern "system" fn(*const c_char) -> c_int;
type RvPs = unsafe extern "system" fn(*const c_char);
type RbPi = unsafe extern "system" fn(c_int) -> u8;
type RbPiss = unsafe extern "system" fn(c_int, *const c_char, *const c_char) -> u8;
type RsPi = unsafe extern "system" fn(c_int) -> *mut c_char;
type RsPiss = unsafe extern "system" fn(c_int, *const c_char, *const c_char) -> *mut c_char;
type RbPis = unsafe extern "system" fn(c_int, *const c_char) -> u8;

/// A loaded (or failed-to-load) shared library plus its symbol cache.
pub struct NativeLibrary {
    path: String,
    library: Result<Library, BridgeError>,
    release_symbol: String,
    symbols: Mutex<HashMap<String, SymbolAddr>>,
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .field("available", &self.library.is_ok())
            .finish_non_exhaustive()
    }
}

impl NativeLibrary {
    /// Load `path`, remembering a failure instead of returning it.
    ///
    /// `release_symbol` names the library function that frees strings it
    /// returned.
    pub fn load(path: &str, release_symbol: &str) -> Self {
        // SAFETY: loading runs the library's initialisers. The libraries this
        // bridge is pointed at are plain C libraries without load-time side
        // effects beyond their own setup.
        let library = unsafe { Library::new(path) }.map_err(|err| BridgeError::Unavailable {
            path: path.to_string(),
            reason: err.to_string(),
        });
        match &library {
            Ok(_) => tracing::debug!(path, "native library loaded"),
            Err(err) => tracing::debug!(path, error = %err, "native library unavailable"),
        }
        Self {
            path: path.to_string(),
            library,
            release_symbol: release_symbol.to_string(),
            symbols: Mutex::new(HashMap::new()),
        }
    }

    /// Load the first of `candidates` that succeeds.
    ///
    /// When none loads, the failure of the last candidate is remembered.
    pub fn load_first(candidates: &[&str], release_symbol: &str) -> Self {
        let mut last = None;
        for candidate in candidates {
            let library = Self::load(candidate, release_symbol);
            if library.is_available() {
                return library;
            }
            last = Some(library);
        }
        last.unwrap_or_else(|| Self {
            path: String::new(),
            library: Err(BridgeError::Unavailable {
                path: String::new(),
                reason: "no library candidates".to_string(),
            }),
            release_symbol: release_symbol.to_string(),
            symbols: Mutex::new(HashMap::new()),
        })
    }

    /// Load `path` and fail if it is not available.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Unavailable`] with the loader's reason.
    pub fn open(path: &str, release_symbol: &str) -> Result<Self, BridgeError> {
        let library = Self::load(path, release_symbol);
        library.availability()?;
        Ok(library)
    }

    /// Path the library was loaded from.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_available(&self) -> bool {
        self.library.is_ok()
    }

    /// The remembered load status.
    ///
    /// # Errors
    ///
    /// Returns the load failure when the library is unavailable.
    pub fn availability(&self) -> Result<(), BridgeError> {
        self.library.as_ref().map(|_| ()).map_err(Clone::clone)
    }

    /// Number of symbols resolved so far.
    pub fn cached_symbols(&self) -> usize {
        self.cache().len()
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, SymbolAddr>> {
        self.symbols.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, name: &str) -> SymbolAddr {
        let library = match &self.library {
            Ok(library) => library,
            Err(err) => {
                panic!("tried to call {name} but the native library is not available: {err}")
            }
        };
        // lookup and insertion under one lock, so each name resolves once
        let mut symbols = self.cache();
        if let Some(addr) = symbols.get(name) {
            return *addr;
        }
        // SAFETY: the symbol is read as a bare address; it is only called
        // through the typed shapes below, which state its real signature.
        let addr = match unsafe { library.get::<*mut c_void>(name.as_bytes()) } {
            Ok(symbol) if !(*symbol).is_null() => SymbolAddr(*symbol),
            Ok(_) => panic!("error resolving symbol {name:?} in {}: null address", self.path),
            Err(err) => panic!("error resolving symbol {name:?} in {}: {err}", self.path),
        };
        symbols.insert(name.to_string(), addr);
        addr
    }

    /// Resolve `name` as a function pointer of type `F`.
    ///
    /// # Safety
    ///
    /// `F` must be an `extern "system"` function pointer type matching the
    /// symbol's real C signature.
    unsafe fn function<F: Copy>(&self, name: &str) -> F {
        let addr = self.resolve(name);
        const { assert!(size_of::<F>() == size_of::<*mut c_void>()) };
        // SAFETY: sizes match and the caller guarantees the signature.
        unsafe { std::mem::transmute_copy::<*mut c_void, F>(&addr.0) }
    }

    /// Copy a returned string and give the buffer back to the library.
    fn take_string(&self, raw: *mut c_char) -> String {
        if raw.is_null() {
            return String::new();
        }
        // SAFETY: a non-null return from these shapes is a NUL-terminated
        // buffer owned by the library until released.
        let value = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        // SAFETY: the release function takes the pointer it handed out.
        unsafe {
            let release: RvPs = self.function(&self.release_symbol);
            release(raw);
        }
        value
    }

    /// `void f(void)`
    ///
    /// # Panics
    ///
    /// Panics when the library is unavailable or lacks `name`.
    pub fn rv(&self, name: &str) {
        // SAFETY: the caller names a symbol with this signature.
        unsafe {
            let f: Rv = self.function(name);
            f();
        }
    }

    /// `int f(void)`
    ///
    /// # Panics
    ///
    /// Panics when the library is unavailable or lacks `name`.
    pub fn ri(&self, name: &str) -> i32 {
        // SAFETY: the caller names a symbol with this signature.
        unsafe {
            let f: Ri = self.function(name);
            f()
        }
    }

    /// `char *f(void)`, released after copying.
    ///
    /// # Panics
    ///
    /// Panics when the library is unavailable or lacks `name`.
    pub fn rs(&self, name: &str) -> String {
        // SAFETY: the caller names a symbol with this signature.
        let raw = unsafe {
            let f: Rs = self.function(name);
            f()
        };
        self.take_string(raw)
    }

    /// `int f(int)`
    ///
    /// # Panics
    ///
    /// Panics when the library is unavailable or lacks `name`.
    pub fn ri_pi(&self, name: &str, i: i32) -> i32 {
        // SAFETY: the caller names a symbol with this signature.
        unsafe {
            let f: RiPi = self.function(name);
            f(i)
        }
    }

    /// `int f(int, int)`
    ///
    /// # Panics
    ///
    /// Panics when the library is unavailable or lacks `name`.
    pub fn ri_pii(&self, name: &str, i1: i32, i2: i32) -> i32 {
        // SAFETY: the caller names a symbol with this signature.
        unsafe {
            let f: RiPii = self.function(name);
            f(i1, i2)
        }
    }

    /// `int f(const char *)`
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InteriorNul`] when `s` cannot be passed to C.
    ///
    /// # Panics
    ///
    /// Panics when the library is unavailable or lacks `name`.
    pub fn ri_ps(&self, name: &str, s: &str) -> Result<i32, BridgeError> {
        let s = c_string(s)?;
        // SAFETY: the caller names a symbol with this signature.
        Ok(unsafe {
            let f: RiPs = self.function(name);
            f(s.as_ptr())
        })
    }

    /// `void f(const char *)`
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InteriorNul`] when `s` cannot be passed to C.
    ///
    /// # Panics
    ///
    /// Panics when the library is unavailable or lacks `name`.
    pub fn rv_ps(&self, name: &str, s: &str) -> Result<(), BridgeError> {
        let s = c_string(s)?;
        // SAFETY: the caller names a symbol with this signature.
        unsafe {
            let f: RvPs = self.function(name);
            f(s.as_ptr());
        }
        Ok(())
    }

    /// `bool f(int)`
    ///
    /// # Panics
    ///
    /// Panics when the library is unavailable or lacks `name`.
    pub fn rb_pi(&self, name: &str, i: i32) -> bool {
        // SAFETY: the caller names a symbol with this signature.
        unsafe {
            let f: RbPi = self.function(name);
            f(i) != 0
        }
    }

    /// `bool f(int, const char *, const char *)`
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InteriorNul`] when a string cannot be passed to C.
    ///
    /// # Panics
    ///
    /// Panics when the library is unavailable or lacks `name`.
    pub fn rb_piss(&self, name: &str, i: i32, s1: &str, s2: &str) -> Result<bool, BridgeError> {
        let s1 = c_string(s1)?;
        let s2 = c_string(s2)?;
        // SAFETY: the caller names a symbol with this signature.
        Ok(unsafe {
            let f: RbPiss = self.function(name);
            f(i, s1.as_ptr(), s2.as_ptr()) != 0
        })
    }

    /// `char *f(int)`, released after copying.
    ///
    /// # Panics
    ///
    /// Panics when the library is unavailable or lacks `name`.
    pub fn rs_pi(&self, name: &str, i: i32) -> String {
        // SAFETY: the caller names a symbol with this signature.
        let raw = unsafe {
            let f: RsPi = self.function(name);
            f(i)
        };
        self.take_string(raw)
    }

    /// `char *f(int, const char *, const char *)`, released after copying.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InteriorNul`] when a string cannot be passed to C.
    ///
    /// # Panics
    ///
    /// Panics when the library is unavailable or lacks `name`.
    pub fn rs_piss(&self, name: &str, i: i32, s1: &str, s2: &str) -> Result<String, BridgeError> {
        let s1 = c_string(s1)?;
        let s2 = c_string(s2)?;
        // SAFETY: the caller names a symbol with this signature.
        let raw = unsafe {
            let f: RsPiss = self.function(name);
            f(i, s1.as_ptr(), s2.as_ptr())
        };
        Ok(self.take_string(raw))
    }

    /// `bool f(int, const char *)`
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InteriorNul`] when `s` cannot be passed to C.
    ///
    /// # Panics
    ///
    /// Panics when the library is unavailable or lacks `name`.
    pub fn rb_pis(&self, name: &str, i: i32, s: &str) -> Result<bool, BridgeError> {
        let s = c_string(s)?;
        // SAFETY: the caller names a symbol with this signature.
        Ok(unsafe {
            let f: RbPis = self.function(name);
            f(i, s.as_ptr()) != 0
        })
    }
}

fn c_string(s: &str) -> Result<CString, BridgeError> {
    CString::new(s).map_err(|_| BridgeError::InteriorNul(s.to_string()))
}

static TELLDUS: OnceLock<NativeLibrary> = OnceLock::new();

/// The process-wide telldus-core bridge.
///
/// The first call loads the library, from `path` when given, otherwise from
/// [`DEFAULT_LIBRARY_NAMES`]. Later calls return the same instance and ignore
/// `path`. The library is never unloaded.
pub fn telldus_at(path: Option<&str>) -> &'static NativeLibrary {
    TELLDUS.get_or_init(|| match path {
        Some(path) => NativeLibrary::load(path, TELLDUS_RELEASE_SYMBOL),
        None => NativeLibrary::load_first(DEFAULT_LIBRARY_NAMES, TELLDUS_RELEASE_SYMBOL),
    })
}

/// The process-wide telldus-core bridge at its default location.
pub fn telldus() -> &'static NativeLibrary {
    telldus_at(None)
}
