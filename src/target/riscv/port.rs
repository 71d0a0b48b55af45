use num_enum::TryFromPrimitive;

/// Reserved addresses in the I/O window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
pub enum Port {
    WriteChar = 0x0800,
    WriteInt = 0x0804,
    WriteUint = 0x0808,
    Halt = 0x080c,
    ReadChar = 0x0812,
    ReadInt = 0x0816,
    DumpPc = 0x0820,
    DumpRegisters = 0x0824,
    DumpMemory = 0x0828,
    Malloc = 0x0830,
    Free = 0x0834,
}

impl Port {
    /// Returns the console input routine answering a load from `address`.
    pub fn input(address: u32) -> Option<Self> {
        match Port::try_from(address) {
            Ok(port @ (Port::ReadChar | Port::ReadInt)) => Some(port),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HeapPort {
    Malloc,
    Free,
}

/// Result of classifying a store address.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Plain(u32),
    Routine(Port),
    Heap(HeapPort),
}

impl Access {
    /// Decides whether a store to `address` is intercepted.
    ///
    /// Output routines and the heap ports only react to stores. The read
    /// ports are plain memory here, see [`Port::input`] for loads.
    pub fn classify(address: u32) -> Self {
        let port = match Port::try_from(address) {
            Ok(port) => port,
            Err(_) => return Access::Plain(address),
        };

        match port {
            Port::Malloc => Access::Heap(HeapPort::Malloc),
            Port::Free => Access::Heap(HeapPort::Free),
            Port::ReadChar | Port::ReadInt => Access::Plain(address),
            _ => Access::Routine(port),
        }
    }
}
