use std::time::Duration;

use modbus_rtu::{Function, Master, Request, Response};

use crate::error::{Error, Result};

/// Two-register read/write primitive the rest of the tool is built on.
/// Framing, CRC and line parameters live below this trait.
pub trait Transport {
    fn read_input_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>>;
    fn read_holding_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>>;
    fn reset_energy_counter(&mut self) -> Result<()>;
}

const REQUEST_TIMEOUT: Duration = Duration::from_millis(300);

/// Write target of the reset command. The meter clears the resettable
/// total energy accumulator when this register is written.
const RESET_REGISTER: u16 = 0x0180;

pub struct RtuTransport {
    master: Master,
    slave: u8,
}

impl RtuTransport {
    pub fn connect(port: &str, baud: u32, slave: u8) -> Result<Self> {
        let master = Master::new_rs485(port, baud)
            .map_err(|err| Error::Protocol(format!("open modbus port: {err}")))?;
        Ok(Self { master, slave })
    }

    fn read(&mut self, function: &Function) -> Result<Vec<u16>> {
        let request = Request::new(self.slave, function, REQUEST_TIMEOUT);
        let response = self
            .master
            .send(&request)
            .map_err(|err| Error::Protocol(format!("register read: {err}")))?;
        match response {
            Response::Value(values) => Ok(values.into_vec()),
            Response::Exception(exception) => {
                Err(Error::Protocol(format!("device exception: {exception:?}")))
            }
            _ => Err(Error::Protocol(
                "unexpected response to register read".into(),
            )),
        }
    }
}

impl Transport for RtuTransport {
    fn read_input_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>> {
        self.read(&Function::ReadInputRegisters {
            starting_address: address,
            quantity,
        })
    }

    fn read_holding_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>> {
        self.read(&Function::ReadHoldingRegisters {
            starting_address: address,
            quantity,
        })
    }

    fn reset_energy_counter(&mut self) -> Result<()> {
        let function = Function::WriteSingleRegister {
            address: RESET_REGISTER,
            value: 0,
        };
        let request = Request::new(self.slave, &function, REQUEST_TIMEOUT);
        let response = self
            .master
            .send(&request)
            .map_err(|err| Error::Protocol(format!("energy counter reset: {err}")))?;
        if response.is_success() {
            Ok(())
        } else {
            Err(Error::Protocol(format!("reset rejected: {response}")))
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;

    use super::Transport;
    use crate::error::{Error, Result};

    /// Scripted transport for tests: serves canned register pairs and
    /// records every wire access.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        pub values: HashMap<u16, [u16; 2]>,
        pub reads: Vec<u16>,
        pub resets: usize,
        pub fail: bool,
    }

    impl MockTransport {
        pub fn with_value(mut self, address: u16, words: [u16; 2]) -> Self {
            self.values.insert(address, words);
            self
        }

        fn serve(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>> {
            if self.fail {
                return Err(Error::Protocol("mock wire failure".into()));
            }
            self.reads.push(address);
            let words = self.values.get(&address).copied().unwrap_or([0, 0]);
            Ok(words[..usize::from(quantity.min(2))].to_vec())
        }
    }

    impl Transport for MockTransport {
        fn read_input_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>> {
            self.serve(address, quantity)
        }

        fn read_holding_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>> {
            self.serve(address, quantity)
        }

        fn reset_energy_counter(&mut self) -> Result<()> {
            if self.fail {
                return Err(Error::Protocol("mock wire failure".into()));
            }
            self.resets += 1;
            Ok(())
        }
    }
}
