//! Table of every function exported by the genuine `winhttp.dll`.
//!
//! Each entry becomes a variant of [`Export`] whose discriminant is the index
//! of its slot in the forwarding table, an [`ExportSymbol`] describing the
//! public name, and on Windows a `proxy_<Name>` forwarder routine. The linker
//! side of the same list lives in `winhttp.def`.

/// Describes one exported function of the genuine library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSymbol {
    /// The export this symbol describes
    pub export: Export,
    /// Exact public name, capitalization matters to the loader
    pub name: &'static str,
    /// Null terminated copy of `name` for passing to the OS
    pub c_name: &'static str,
    /// Ordinal pinned in the module definition, checked against `winhttp.def`
    #[cfg(test)]
    pub ordinal: Option<u16>,
}

macro_rules! export_table {
    (@ordinal) => { None };
    (@ordinal $ordinal:literal) => { Some($ordinal) };
    ($($name:ident $(@ $ordinal:literal)?),* $(,)?) => {
        /// Functions exported by the genuine library, in export order
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(usize)]
        pub enum Export {
            $($name,)*
        }

        /// Number of functions forwarded by the proxy
        pub const EXPORT_COUNT: usize = [$(stringify!($name)),*].len();

        /// Symbol information for every [`Export`], indexed by discriminant
        pub static EXPORTS: [ExportSymbol; EXPORT_COUNT] = [
            $(ExportSymbol {
                export: Export::$name,
                name: stringify!($name),
                c_name: concat!(stringify!($name), "\0"),
                #[cfg(test)]
                ordinal: export_table!(@ordinal $($ordinal)?),
            },)*
        ];

        #[cfg(windows)]
        mod forwarders {
            $(forwarder!($name);)*
        }
    };
}

impl Export {
    /// Index of this export's slot in the forwarding table
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

export_table! {
    DllCanUnloadNow @ 1,
    DllGetClassObject @ 2,
    Private1,
    SvchostPushServiceGlobals,
    WinHttpAddRequestHeaders,
    WinHttpAddRequestHeadersEx,
    WinHttpAutoProxySvcMain,
    WinHttpCheckPlatform,
    WinHttpCloseHandle,
    WinHttpConnect,
    WinHttpConnectionDeletePolicyEntries,
    WinHttpConnectionDeleteProxyInfo,
    WinHttpConnectionFreeNameList,
    WinHttpConnectionFreeProxyInfo,
    WinHttpConnectionFreeProxyList,
    WinHttpConnectionGetNameList,
    WinHttpConnectionGetProxyInfo,
    WinHttpConnectionGetProxyList,
    WinHttpConnectionOnlyConvert,
    WinHttpConnectionOnlyReceive,
    WinHttpConnectionOnlySend,
    WinHttpConnectionSetPolicyEntries,
    WinHttpConnectionSetProxyInfo,
    WinHttpConnectionUpdateIfIndexTable,
    WinHttpCrackUrl,
    WinHttpCreateProxyList,
    WinHttpCreateProxyManager,
    WinHttpCreateProxyResolver,
    WinHttpCreateProxyResult,
    WinHttpCreateUiCompatibleProxyString,
    WinHttpCreateUrl,
    WinHttpDetectAutoProxyConfigUrl,
    WinHttpFreeProxyResult,
    WinHttpFreeProxyResultEx,
    WinHttpFreeProxySettings,
    WinHttpFreeProxySettingsEx,
    WinHttpFreeQueryConnectionGroupResult,
    WinHttpGetDefaultProxyConfiguration,
    WinHttpGetIEProxyConfigForCurrentUser,
    WinHttpGetProxyForUrl,
    WinHttpGetProxyForUrlEx,
    WinHttpGetProxyForUrlEx2,
    WinHttpGetProxyForUrlHvsi,
    WinHttpGetProxyResult,
    WinHttpGetProxyResultEx,
    WinHttpGetProxySettingsEx,
    WinHttpGetProxySettingsResultEx,
    WinHttpGetProxySettingsVersion,
    WinHttpGetTunnelSocket,
    WinHttpOpen,
    WinHttpOpenRequest,
    WinHttpPacJsWorkerMain,
    WinHttpProbeConnectivity,
    WinHttpProtocolCompleteUpgrade,
    WinHttpProtocolReceive,
    WinHttpProtocolSend,
    WinHttpQueryAuthSchemes,
    WinHttpQueryConnectionGroup,
    WinHttpQueryDataAvailable,
    WinHttpQueryHeaders,
    WinHttpQueryHeadersEx,
    WinHttpQueryOption,
    WinHttpReadData,
    WinHttpReadDataEx,
    WinHttpReadProxySettings,
    WinHttpReadProxySettingsHvsi,
    WinHttpReceiveResponse,
    WinHttpRefreshProxySettings,
    WinHttpRegisterProxyChangeNotification,
    WinHttpResetAutoProxy,
    WinHttpResolverGetProxyForUrl,
    WinHttpSaveProxyCredentials,
    WinHttpSendRequest,
    WinHttpSetCredentials,
    WinHttpSetDefaultProxyConfiguration,
    WinHttpSetOption,
    WinHttpSetProxySettingsPerUser,
    WinHttpSetSecureLegacyServersAppCompat,
    WinHttpSetStatusCallback,
    WinHttpSetTimeouts,
    WinHttpTimeFromSystemTime,
    WinHttpTimeToSystemTime,
    WinHttpUnregisterProxyChangeNotification,
    WinHttpWebSocketClose,
    WinHttpWebSocketCompleteUpgrade,
    WinHttpWebSocketQueryCloseStatus,
    WinHttpWebSocketReceive,
    WinHttpWebSocketSend,
    WinHttpWebSocketShutdown,
    WinHttpWriteData,
    WinHttpWriteProxySettings,
}

#[cfg(test)]
mod tests {
    use super::{Export, EXPORTS, EXPORT_COUNT};
    use std::collections::HashSet;

    const MODULE_DEFINITION: &str = include_str!("../../winhttp.def");

    /// Parses the `Name=internal @N` lines of the module definition
    fn definition_entries() -> Vec<(String, String, Option<u16>)> {
        MODULE_DEFINITION
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && *line != "EXPORTS" && !line.starts_with("LIBRARY"))
            .map(|line| {
                let mut parts = line.split_whitespace();
                let (name, internal) = parts
                    .next()
                    .and_then(|entry| entry.split_once('='))
                    .expect("Definition entry without internal name");
                let ordinal = parts
                    .find_map(|part| part.strip_prefix('@'))
                    .map(|ordinal| ordinal.parse().expect("Invalid ordinal"));
                (name.to_string(), internal.to_string(), ordinal)
            })
            .collect()
    }

    #[test]
    fn table_matches_module_definition() {
        let entries = definition_entries();
        assert_eq!(entries.len(), EXPORT_COUNT);

        for (symbol, (name, internal, ordinal)) in EXPORTS.iter().zip(&entries) {
            assert_eq!(symbol.name, name);
            assert_eq!(internal, &format!("proxy_{name}"));
            assert_eq!(symbol.ordinal, *ordinal, "ordinal of {name}");
        }
    }

    #[test]
    fn names_are_unique_and_null_terminated() {
        let names: HashSet<&str> = EXPORTS.iter().map(|symbol| symbol.name).collect();
        assert_eq!(names.len(), EXPORT_COUNT);

        for symbol in &EXPORTS {
            assert_eq!(symbol.c_name.strip_suffix('\0'), Some(symbol.name));
            assert!(!symbol.name.contains('\0'));
        }
    }

    #[test]
    fn discriminants_index_the_table() {
        for (index, symbol) in EXPORTS.iter().enumerate() {
            assert_eq!(symbol.export.index(), index);
            assert_eq!(&EXPORTS[symbol.export.index()], symbol);
        }

        assert_eq!(EXPORTS[Export::WinHttpOpen.index()].name, "WinHttpOpen");
        assert_eq!(EXPORT_COUNT, 91);
    }

    #[test]
    fn only_com_entry_points_have_ordinals() {
        let pinned: Vec<(&str, u16)> = EXPORTS
            .iter()
            .filter_map(|symbol| symbol.ordinal.map(|ordinal| (symbol.name, ordinal)))
            .collect();

        assert_eq!(
            pinned,
            [("DllCanUnloadNow", 1), ("DllGetClassObject", 2)]
        );
    }
}
