bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClassAccessFlag: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldAccessFlag: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNTHETIC = 0x1000;
        const ENUM = 0x4000;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodAccessFlag: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
    }
}

impl ClassAccessFlag {
    pub fn is_public(self) -> bool {
        self.contains(ClassAccessFlag::PUBLIC)
    }

    pub fn is_interface(self) -> bool {
        self.contains(ClassAccessFlag::INTERFACE)
    }
}

impl FieldAccessFlag {
    pub fn is_public(self) -> bool {
        self.contains(FieldAccessFlag::PUBLIC)
    }

    pub fn is_static(self) -> bool {
        self.contains(FieldAccessFlag::STATIC)
    }
}

impl MethodAccessFlag {
    pub fn is_public(self) -> bool {
        self.contains(MethodAccessFlag::PUBLIC)
    }

    pub fn is_static(self) -> bool {
        self.contains(MethodAccessFlag::STATIC)
    }

    pub fn is_varargs(self) -> bool {
        self.contains(MethodAccessFlag::VARARGS)
    }
}
