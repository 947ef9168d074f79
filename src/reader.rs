use crate::catalog::{Catalog, Register, RegisterKind};
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Fetches raw register pairs through the transport. Constructed with
/// `None` for the offline diagnostic mode, where every read yields
/// zeroed words instead of touching a wire.
pub struct RegisterReader<'t> {
    transport: Option<&'t mut dyn Transport>,
}

impl<'t> RegisterReader<'t> {
    pub fn new(transport: Option<&'t mut dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn read_one(&mut self, register: &Register) -> Result<[u16; 2]> {
        let Some(transport) = self.transport.as_deref_mut() else {
            return Ok([0, 0]);
        };
        let words = match register.kind {
            RegisterKind::Input => transport.read_input_registers(register.address, 2)?,
            RegisterKind::Holding => transport.read_holding_registers(register.address, 2)?,
        };
        if words.len() < 2 {
            return Err(Error::Protocol(format!(
                "short response for register {:#06x}",
                register.address
            )));
        }
        Ok([words[0], words[1]])
    }

    /// Read every catalog entry with `begin <= address < end`, in order.
    /// Consecutive rows that alias the same physical address reuse the
    /// previous words instead of issuing a second wire read. The first
    /// transport failure aborts the remaining scan.
    pub fn read_range<'c>(
        &mut self,
        catalog: &'c Catalog,
        begin: u16,
        end: u16,
    ) -> Result<Vec<(&'c Register, [u16; 2])>> {
        let mut out = Vec::new();
        let mut last: Option<(u16, [u16; 2])> = None;
        for register in catalog.range_scan(begin, end) {
            let words = match last {
                Some((address, words)) if address == register.address => words,
                _ => {
                    let words = self.read_one(register)?;
                    last = Some((register.address, words));
                    words
                }
            };
            out.push((register, words));
        }
        Ok(out)
    }
}
