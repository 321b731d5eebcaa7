//! Forwarder routines exported in place of the genuine functions.
//!
//! Every forwarder is a single indirect jump through its slot in
//! [`FORWARD_TABLE`](super::FORWARD_TABLE). Nothing is pushed and no register
//! is touched, so the genuine function sees the caller's arguments and returns
//! straight to the caller. The forwarders have no signature on the Rust side
//! which is why they are written in assembly for each supported architecture.

/// Emits the `proxy_<Name>` routine for an export
macro_rules! forwarder {
    ($name:ident) => {
        #[cfg(target_arch = "x86_64")]
        std::arch::global_asm!(
            ".text",
            ".p2align 4",
            concat!(".globl proxy_", stringify!($name)),
            concat!("proxy_", stringify!($name), ":"),
            "    jmp qword ptr [rip + {table} + {offset}]",
            table = sym $crate::proxy::FORWARD_TABLE,
            offset = const $crate::proxy::Export::$name.index() * core::mem::size_of::<usize>(),
        );

        // 32-bit C symbols carry a leading underscore
        #[cfg(target_arch = "x86")]
        std::arch::global_asm!(
            ".text",
            ".p2align 4",
            concat!(".globl _proxy_", stringify!($name)),
            concat!("_proxy_", stringify!($name), ":"),
            "    jmp dword ptr [{table} + {offset}]",
            table = sym $crate::proxy::FORWARD_TABLE,
            offset = const $crate::proxy::Export::$name.index() * core::mem::size_of::<usize>(),
        );
    };
}
