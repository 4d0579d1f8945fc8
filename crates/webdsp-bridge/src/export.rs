//! C ABI for DSP units compiled to a sandboxed module.
//!
//! [`export_plugin!`](crate::export_plugin) emits the `dpf_*` entry points for
//! one plugin type. The module instance is single-threaded, so the dispatcher
//! lives in a thread-local cell created on first use.
//!
//! Strings flow host→module through the argument cells returned by
//! `dpf_string_arg`, and module→host through the return slots returned by
//! `dpf_return_slots`. Audio flows through `dpf_input_block` and
//! `dpf_output_block`.

use crate::midi::MidiEvent;
use crate::plugin::Host;
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_arch = "wasm32")]
mod imports {
    #[link(wasm_import_module = "env")]
    extern "C" {
        pub fn dpf_get_sample_rate() -> f32;
        pub fn dpf_write_midi_event(frame: u32, data: u32) -> i32;
    }
}

/// 48 kHz, as bits.
static NATIVE_SAMPLE_RATE: AtomicU32 = AtomicU32::new(0x473B_8000);

/// Sample rate reported by [`ModuleHost`] outside a sandboxed module.
pub fn set_native_sample_rate(rate: f32) {
    NATIVE_SAMPLE_RATE.store(rate.to_bits(), Ordering::Relaxed);
}

/// Host functions imported from the embedding module `env`.
///
/// Built for a native target (tests, tooling) there is no embedding host: the
/// sample rate comes from [`set_native_sample_rate`] and MIDI output is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleHost;

impl Host for ModuleHost {
    #[cfg(target_arch = "wasm32")]
    fn sample_rate(&self) -> f32 {
        // SAFETY: provided by the embedding host, no arguments.
        unsafe { imports::dpf_get_sample_rate() }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn sample_rate(&self) -> f32 {
        f32::from_bits(NATIVE_SAMPLE_RATE.load(Ordering::Relaxed))
    }

    #[cfg(target_arch = "wasm32")]
    fn write_midi_event(&mut self, event: &MidiEvent) -> bool {
        // SAFETY: plain scalar arguments.
        unsafe { imports::dpf_write_midi_event(event.frame, event.packed()) != 0 }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn write_midi_event(&mut self, _event: &MidiEvent) -> bool {
        false
    }
}

/// Export the bridge entry points for a plugin type.
///
/// ```ignore
/// webdsp_bridge::export_plugin!(Gain);
/// // or with an explicit constructor
/// webdsp_bridge::export_plugin!(Gain, Gain::new(0.5));
/// ```
///
/// Exported functions: `dpf_get_label`, `dpf_get_maker`, `dpf_get_license`,
/// `dpf_get_version`, `dpf_get_unique_id`, `dpf_init_parameter`,
/// `dpf_get_parameter_value`, `dpf_set_parameter_value`, `dpf_init_state`,
/// `dpf_set_state`, `dpf_get_state`, `dpf_init_program_name`,
/// `dpf_load_program`, `dpf_activate`, `dpf_deactivate`, `dpf_run`,
/// `dpf_enqueue_midi_event`, `dpf_set_io`, `dpf_num_inputs`,
/// `dpf_num_outputs`, `dpf_input_block`, `dpf_output_block`,
/// `dpf_return_slots` and `dpf_string_arg`.
#[macro_export]
macro_rules! export_plugin {
    ($plugin:ty) => {
        $crate::export_plugin!($plugin, <$plugin as ::core::default::Default>::default());
    };
    ($plugin:ty, $init:expr) => {
        #[doc(hidden)]
        type __WebdspPlugin = $plugin;

        #[doc(hidden)]
        fn __webdsp_new_plugin() -> __WebdspPlugin {
            $init
        }

        #[doc(hidden)]
        pub mod __webdsp_exports {
            use super::{__webdsp_new_plugin, __WebdspPlugin};
            use ::std::cell::RefCell;
            use ::std::ffi::c_char;
            use $crate::export::ModuleHost;
            use $crate::{Dispatcher, MidiEvent, ReturnSlots};

            type ModuleDispatcher = Dispatcher<__WebdspPlugin, ModuleHost>;

            thread_local! {
                static DISPATCHER: RefCell<Option<ModuleDispatcher>> = const { RefCell::new(None) };
            }

            fn with<R>(f: impl FnOnce(&mut ModuleDispatcher) -> R) -> R {
                DISPATCHER.with(|cell| {
                    let mut slot = cell.borrow_mut();
                    let dispatcher = slot
                        .get_or_insert_with(|| Dispatcher::new(__webdsp_new_plugin(), ModuleHost));
                    f(dispatcher)
                })
            }

            #[no_mangle]
            pub extern "C" fn dpf_get_label() -> *const c_char {
                with(|d| d.get_label().as_ptr())
            }

            #[no_mangle]
            pub extern "C" fn dpf_get_maker() -> *const c_char {
                with(|d| d.get_maker().as_ptr())
            }

            #[no_mangle]
            pub extern "C" fn dpf_get_license() -> *const c_char {
                with(|d| d.get_license().as_ptr())
            }

            #[no_mangle]
            pub extern "C" fn dpf_get_version() -> u32 {
                with(|d| d.get_version())
            }

            #[no_mangle]
            pub extern "C" fn dpf_get_unique_id() -> i64 {
                with(|d| d.get_unique_id())
            }

            #[no_mangle]
            pub extern "C" fn dpf_init_parameter(index: u32) {
                with(|d| {
                    d.init_parameter(index);
                })
            }

            #[no_mangle]
            pub extern "C" fn dpf_get_parameter_value(index: u32) -> f32 {
                with(|d| d.get_parameter_value(index))
            }

            #[no_mangle]
            pub extern "C" fn dpf_set_parameter_value(index: u32, value: f32) {
                with(|d| d.set_parameter_value(index, value))
            }

            #[no_mangle]
            pub extern "C" fn dpf_init_state(index: u32) {
                with(|d| {
                    d.init_state(index);
                })
            }

            /// Key and value are read from string arguments 0 and 1.
            #[no_mangle]
            pub extern "C" fn dpf_set_state() {
                with(|d| d.set_state_from_args())
            }

            /// Key is read from string argument 0.
            #[no_mangle]
            pub extern "C" fn dpf_get_state() -> *const c_char {
                with(|d| d.get_state_from_args().as_ptr())
            }

            #[no_mangle]
            pub extern "C" fn dpf_init_program_name(index: u32) -> *const c_char {
                with(|d| {
                    d.init_program_name(index);
                    d.slots().str_ptr(0)
                })
            }

            #[no_mangle]
            pub extern "C" fn dpf_load_program(index: u32) {
                with(|d| d.load_program(index))
            }

            #[no_mangle]
            pub extern "C" fn dpf_activate() {
                with(|d| d.activate())
            }

            #[no_mangle]
            pub extern "C" fn dpf_deactivate() {
                with(|d| d.deactivate())
            }

            /// Returns 0 on success, otherwise the error code.
            #[no_mangle]
            pub extern "C" fn dpf_run(frames: u32) -> i32 {
                with(|d| match d.run(frames as usize) {
                    Ok(()) => 0,
                    Err(e) => e.code(),
                })
            }

            #[no_mangle]
            pub extern "C" fn dpf_enqueue_midi_event(frame: u32, data: u32) -> i32 {
                with(|d| d.enqueue_midi_event(MidiEvent::from_packed(frame, data)) as i32)
            }

            #[no_mangle]
            pub extern "C" fn dpf_set_io(num_inputs: u32, num_outputs: u32) -> i32 {
                with(|d| match d.set_io(num_inputs as usize, num_outputs as usize) {
                    Ok(()) => 0,
                    Err(e) => e.code(),
                })
            }

            #[no_mangle]
            pub extern "C" fn dpf_num_inputs() -> u32 {
                with(|d| d.io().inputs as u32)
            }

            #[no_mangle]
            pub extern "C" fn dpf_num_outputs() -> u32 {
                with(|d| d.io().outputs as u32)
            }

            #[no_mangle]
            pub extern "C" fn dpf_input_block() -> *mut f32 {
                with(|d| d.regions_mut().input_ptr())
            }

            #[no_mangle]
            pub extern "C" fn dpf_output_block() -> *mut f32 {
                with(|d| d.regions_mut().output_ptr())
            }

            #[no_mangle]
            pub extern "C" fn dpf_return_slots() -> *const ReturnSlots {
                with(|d| d.slots() as *const ReturnSlots)
            }

            /// Null when `index` is not an argument cell.
            #[no_mangle]
            pub extern "C" fn dpf_string_arg(index: u32) -> *mut u8 {
                with(|d| {
                    d.args_mut()
                        .string_cell_mut(index as usize)
                        .map_or(::std::ptr::null_mut(), |cell| cell.as_mut_ptr())
                })
            }
        }
    };
}
