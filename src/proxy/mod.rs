//! Forwarding table that makes the proxy a transparent stand in for the
//! genuine `winhttp.dll`.
//!
//! The genuine library is loaded from the system directory while the proxy is
//! attaching and the address of every known export is stored in
//! [`FORWARD_TABLE`]. The exported forwarders jump through those slots.

use std::{
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Once,
    },
};

#[cfg(windows)]
#[macro_use]
mod forward;
mod exports;
pub mod library;

pub use exports::{Export, ExportSymbol, EXPORTS, EXPORT_COUNT};

/// Table read by the exported forwarders
pub static FORWARD_TABLE: ForwardTable = ForwardTable::new();

/// Source of genuine function addresses
pub trait SymbolSource {
    /// Resolves the address of `symbol`, [`None`] when it is not exported
    fn resolve(&self, symbol: &ExportSymbol) -> Option<NonZeroUsize>;
}

/// Source used when the genuine library could not be loaded, every
/// export is absent
pub struct Unresolved;

impl SymbolSource for Unresolved {
    fn resolve(&self, _symbol: &ExportSymbol) -> Option<NonZeroUsize> {
        None
    }
}

/// Outcome of binding the forwarding table
#[derive(Debug)]
pub struct BindReport {
    /// Number of exports bound to a genuine address
    pub resolved: usize,
    /// Exports the source did not provide
    pub missing: Vec<&'static str>,
}

/// One address slot per export, written once while attaching and only read
/// afterwards. The forwarders address the slots directly so they must stay
/// the first field.
#[repr(C)]
pub struct ForwardTable {
    slots: [AtomicUsize; EXPORT_COUNT],
    bound: Once,
}

impl ForwardTable {
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const EMPTY_SLOT: AtomicUsize = AtomicUsize::new(0);

        Self {
            slots: [EMPTY_SLOT; EXPORT_COUNT],
            bound: Once::new(),
        }
    }

    /// Resolves every export from `source` and stores the addresses. Only the
    /// first call binds the table, later calls return [`None`]
    ///
    /// Absent exports are left as null slots. Not every Windows version
    /// exports every function, calling the forwarder of an absent export
    /// jumps to null.
    pub fn bind<S>(&self, source: &S) -> Option<BindReport>
    where
        S: SymbolSource + ?Sized,
    {
        let mut report = None;

        self.bound.call_once(|| {
            let mut missing = Vec::new();

            for (slot, symbol) in self.slots.iter().zip(EXPORTS.iter()) {
                match source.resolve(symbol) {
                    Some(address) => slot.store(address.get(), Ordering::Release),
                    None => missing.push(symbol.name),
                }
            }

            report = Some(BindReport {
                resolved: EXPORT_COUNT - missing.len(),
                missing,
            });
        });

        report
    }

    /// Whether the table has been bound
    pub fn is_bound(&self) -> bool {
        self.bound.is_completed()
    }

    /// The genuine address `export` forwards to
    pub fn address(&self, export: Export) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.slots[export.index()].load(Ordering::Acquire))
    }
}

impl Default for ForwardTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads the genuine library and binds [`FORWARD_TABLE`] against it. A
/// missing library binds every export as absent
#[cfg(windows)]
pub fn bind_genuine_library() {
    use library::GenuineLibrary;
    use log::{debug, warn};

    if FORWARD_TABLE.is_bound() {
        return;
    }

    let report = match GenuineLibrary::load() {
        Ok(library) => {
            debug!("Loaded genuine library from {}", library.path().display());
            FORWARD_TABLE.bind(&library)
        }
        Err(err) => {
            warn!("Failed to load genuine library: {err}");
            FORWARD_TABLE.bind(&Unresolved)
        }
    };

    let Some(report) = report else {
        return;
    };

    debug!("Bound {} of {} exports", report.resolved, EXPORT_COUNT);

    if !report.missing.is_empty() {
        debug!("Exports absent from genuine library: {}", report.missing.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::{Export, ExportSymbol, ForwardTable, SymbolSource, Unresolved, EXPORTS, EXPORT_COUNT};
    use std::{collections::HashMap, num::NonZeroUsize};

    /// Library exporting every name at a distinct fake address except `absent`
    struct FakeLibrary {
        addresses: HashMap<&'static str, NonZeroUsize>,
    }

    impl FakeLibrary {
        fn without(absent: &[&str]) -> Self {
            let addresses = EXPORTS
                .iter()
                .enumerate()
                .filter(|(_, symbol)| !absent.contains(&symbol.name))
                .filter_map(|(index, symbol)| {
                    NonZeroUsize::new(0x1000_0000 + index * 0x40).map(|address| (symbol.name, address))
                })
                .collect();
            Self { addresses }
        }
    }

    impl SymbolSource for FakeLibrary {
        fn resolve(&self, symbol: &ExportSymbol) -> Option<NonZeroUsize> {
            self.addresses.get(symbol.name).copied()
        }
    }

    #[test]
    fn binds_every_export_to_resolved_address() {
        let library = FakeLibrary::without(&[]);
        let table = ForwardTable::new();

        let report = table.bind(&library).expect("First bind should run");
        assert_eq!(report.resolved, EXPORT_COUNT);
        assert!(report.missing.is_empty());
        assert!(table.is_bound());

        for symbol in &EXPORTS {
            assert_eq!(table.address(symbol.export), library.resolve(symbol));
        }
    }

    #[test]
    fn absent_exports_stay_null() {
        let library = FakeLibrary::without(&["WinHttpGetProxyForUrlHvsi", "Private1"]);
        let table = ForwardTable::new();

        let report = table.bind(&library).expect("First bind should run");
        assert_eq!(report.resolved, EXPORT_COUNT - 2);
        assert_eq!(report.missing, ["Private1", "WinHttpGetProxyForUrlHvsi"]);

        assert_eq!(table.address(Export::Private1), None);
        assert_eq!(table.address(Export::WinHttpGetProxyForUrlHvsi), None);
        assert!(table.address(Export::WinHttpOpen).is_some());
    }

    #[test]
    fn missing_library_binds_nothing() {
        let table = ForwardTable::new();

        let report = table.bind(&Unresolved).expect("First bind should run");
        assert_eq!(report.resolved, 0);
        assert_eq!(report.missing.len(), EXPORT_COUNT);
        assert!(table.is_bound());
        assert!(EXPORTS.iter().all(|symbol| table.address(symbol.export).is_none()));
    }

    #[test]
    fn table_is_bound_once() {
        let table = ForwardTable::new();
        assert!(!table.is_bound());

        table.bind(&FakeLibrary::without(&[])).expect("First bind should run");
        let first = table.address(Export::WinHttpSendRequest);

        assert!(table.bind(&Unresolved).is_none());
        assert_eq!(table.address(Export::WinHttpSendRequest), first);
    }

    #[test]
    fn slots_are_laid_out_by_export_index() {
        let table = ForwardTable::new();
        table.bind(&FakeLibrary::without(&[])).expect("First bind should run");

        let base = &table as *const ForwardTable as *const usize;
        let export = Export::WinHttpReadData;
        let slot = unsafe { *base.add(export.index()) };
        assert_eq!(Some(slot), table.address(export).map(NonZeroUsize::get));
    }
}
