//! Task event bits for the central state machine.

use bitflags::bitflags;

bitflags! {
    /// Pending work for [`super::central::Central`].  Several bits may be
    /// set at once; they are handled one at a time in [`Events::PRIORITY`]
    /// order.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Events: u16 {
        const START_DEVICE = 0x0001;
        const START_DISCOVERY = 0x0002;
        const START_SCAN = 0x0004;
        const START_SVC_DISCOVERY = 0x0008;
        const START_PARAM_UPDATE = 0x0010;
        const START_PHY_UPDATE = 0x0020;
        const START_READ_OR_WRITE = 0x0040;
        const START_WRITE_CCCD = 0x0080;
        const START_READ_RSSI = 0x0100;
        const ESTABLISH_LINK_TIMEOUT = 0x0200;
        const START_LED_BLINK = 0x0400;
    }
}

impl Events {
    /// Handling order, highest priority first.
    pub const PRIORITY: [Events; 11] = [
        Events::ESTABLISH_LINK_TIMEOUT,
        Events::START_DEVICE,
        Events::START_DISCOVERY,
        Events::START_SCAN,
        Events::START_SVC_DISCOVERY,
        Events::START_PARAM_UPDATE,
        Events::START_PHY_UPDATE,
        Events::START_READ_OR_WRITE,
        Events::START_WRITE_CCCD,
        Events::START_READ_RSSI,
        Events::START_LED_BLINK,
    ];

    /// Events that belong to one connection attempt and die with it.
    pub const LINK_ATTEMPT: Events = Events::START_DISCOVERY
        .union(Events::START_SCAN)
        .union(Events::START_SVC_DISCOVERY)
        .union(Events::START_PARAM_UPDATE)
        .union(Events::START_PHY_UPDATE)
        .union(Events::START_READ_OR_WRITE)
        .union(Events::START_WRITE_CCCD)
        .union(Events::START_READ_RSSI)
        .union(Events::ESTABLISH_LINK_TIMEOUT);

    /// Highest-priority bit set in `self`.
    pub fn next(self) -> Option<Events> {
        Self::PRIORITY.into_iter().find(|e| self.contains(*e))
    }
}
