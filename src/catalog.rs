#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    /// Read-only measurement register (modbus function 0x04).
    Input,
    /// Read/write setup register (modbus function 0x03).
    Holding,
}

#[derive(Debug)]
pub struct Register {
    pub address: u16,
    pub description: &'static str,
    pub unit: Option<&'static str>,
    pub kind: RegisterKind,
}

#[cfg(feature = "sdm630")]
const REGISTERS: &[Register] = &[
    reg(0x06, "Phase 1 current", Some("A"), RegisterKind::Input),
    reg(0x08, "Phase 2 current", Some("A"), RegisterKind::Input),
    reg(0x0A, "Phase 3 current", Some("A"), RegisterKind::Input),
    reg(0x0C, "Phase 1 power", Some("W"), RegisterKind::Input),
    reg(0x0E, "Phase 2 power", Some("W"), RegisterKind::Input),
    reg(0x10, "Phase 3 power", Some("W"), RegisterKind::Input),
    reg(0x12, "Phase 1 apparent power", Some("VA"), RegisterKind::Input),
    reg(0x14, "Phase 2 apparent power", Some("VA"), RegisterKind::Input),
    reg(0x16, "Phase 3 apparent power", Some("VA"), RegisterKind::Input),
];

#[cfg(not(feature = "sdm630"))]
const REGISTERS: &[Register] = &[
    reg(0x14, "Modbus address", None, RegisterKind::Holding),
    reg(0x18, "Password", None, RegisterKind::Holding),
    reg(0x1C, "Baud rate index", None, RegisterKind::Holding),
    reg(0x34, "Total system power", Some("W"), RegisterKind::Input),
    reg(0x0156, "Total energy", Some("kWh"), RegisterKind::Input),
    reg(0x0180, "Resetable total energy", Some("kWh"), RegisterKind::Input),
];

const fn reg(
    address: u16,
    description: &'static str,
    unit: Option<&'static str>,
    kind: RegisterKind,
) -> Register {
    Register {
        address,
        description,
        unit,
        kind,
    }
}

/// Immutable register table, ordered ascending by address. Entries may
/// alias the same physical address; range scans read such rows once.
pub struct Catalog {
    entries: &'static [Register],
}

impl Catalog {
    pub const fn new(entries: &'static [Register]) -> Self {
        Self { entries }
    }

    /// The table compiled into this build.
    pub const fn active() -> Self {
        Self::new(REGISTERS)
    }

    pub fn lookup(&self, address: u16) -> Option<&Register> {
        self.entries.iter().find(|reg| reg.address == address)
    }

    /// Entries with `begin <= address < end`, in catalog order.
    pub fn range_scan(&self, begin: u16, end: u16) -> impl Iterator<Item = &Register> {
        self.entries
            .iter()
            .skip_while(move |reg| reg.address < begin)
            .take_while(move |reg| reg.address < end)
    }

    pub fn entries(&self) -> &[Register] {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::{Catalog, Register, RegisterKind, reg};

    const TABLE: &[Register] = &[
        reg(0x14, "Alpha", None, RegisterKind::Holding),
        reg(0x34, "Beta", Some("W"), RegisterKind::Input),
        reg(0x0156, "Gamma", Some("kWh"), RegisterKind::Input),
    ];

    #[test]
    fn active_table_is_sorted_ascending() {
        let catalog = Catalog::active();
        let addresses: Vec<u16> = catalog.entries().iter().map(|r| r.address).collect();
        let mut sorted = addresses.clone();
        sorted.sort_unstable();
        assert_eq!(addresses, sorted);
        assert!(!addresses.is_empty());
    }

    #[test]
    fn lookup_finds_known_address() {
        let catalog = Catalog::new(TABLE);
        let reg = catalog.lookup(0x34).expect("register should exist");
        assert_eq!(reg.description, "Beta");
        assert_eq!(reg.kind, RegisterKind::Input);
        assert!(catalog.lookup(0x35).is_none());
    }

    #[test]
    fn range_scan_honors_half_open_bounds() {
        let catalog = Catalog::new(TABLE);
        let hits: Vec<u16> = catalog.range_scan(0x14, 0x0156).map(|r| r.address).collect();
        assert_eq!(hits, vec![0x14, 0x34]);
        let all: Vec<u16> = catalog.range_scan(0, u16::MAX).map(|r| r.address).collect();
        assert_eq!(all.len(), TABLE.len());
        assert_eq!(catalog.range_scan(0x200, u16::MAX).count(), 0);
    }
}
