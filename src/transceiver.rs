//! Bus transceivers.
//!
//! A [`Transceiver`] owns a device's addressing (individual address,
//! optional domain address) and the table of group addresses it listens to.
//! [`MulticastTransceiver`] is the KNXnet/IP routing implementation: group
//! telegrams travel as `ROUTING_INDICATION` datagrams on the bus multicast
//! group.
//!
//! ## Example
//!
//! ```rust,no_run
//! use knx_fieldbus::config::MulticastConfig;
//! use knx_fieldbus::dpt::{Dpt9, DptConverter};
//! use knx_fieldbus::transceiver::{MulticastTransceiver, Transceiver};
//! use knx_fieldbus::{ga, IndividualAddress, Priority};
//!
//! let mut bus = MulticastTransceiver::bind(
//!     MulticastConfig::default(),
//!     IndividualAddress::new(1, 1, 10)?,
//! )?;
//! bus.add_group_address(ga!(1/2/3), false)?;
//!
//! let mut temperature = DptConverter::<Dpt9>::new(&Dpt9::TEMPERATURE);
//! temperature.set_value(21.5)?;
//! bus.write(ga!(1/2/3), Priority::Low, &temperature)?;
//!
//! if let Some(telegram) = bus.receive()? {
//!     println!("{} -> {}: {:?}", telegram.source, telegram.destination, telegram.apci);
//! }
//! bus.cleanup();
//! # Ok::<(), knx_fieldbus::KnxError>(())
//! ```

use std::collections::BTreeMap;
use std::net::UdpSocket;

use core::net::SocketAddr;

use crate::addressing::{DomainAddress, GroupAddress, IndividualAddress};
use crate::config::MulticastConfig;
use crate::dpt::{DptCodec, DptConverter};
use crate::error::{KnxError, Result};
use crate::knx_log;
use crate::net::multicast::{MulticastReceive, MulticastTransmit};
use crate::net::socket::{open_receive_socket, open_transmit_socket, DatagramSocket};
use crate::protocol::apdu::{Apci, Apdu, ApduData};
use crate::protocol::cemi::{CEMIFrame, CemiFactory};
use crate::protocol::constants::{CEMIMessageCode, ServiceType};
use crate::protocol::frame::{FrameBuilder, KnxnetIpFrame};
use crate::protocol::priority::Priority;

/// Device side of a bus medium.
pub trait Transceiver {
    /// Listen to `gad`. `send_l2_ack` records whether telegrams to this
    /// address are acknowledged on layer 2. Adding a known address updates
    /// the flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot join the address.
    fn add_group_address(&mut self, gad: GroupAddress, send_l2_ack: bool) -> Result<()>;

    /// Stop listening to `gad`.
    ///
    /// # Errors
    ///
    /// Not-found error (see [`KnxError::is_not_found`]) if `gad` was never
    /// added.
    fn remove_group_address(&mut self, gad: GroupAddress) -> Result<()>;

    /// Release sockets and memberships. Further calls do nothing.
    fn cleanup(&mut self);

    /// Domain address on open media, `None` elsewhere.
    fn domain_address(&self) -> Option<DomainAddress>;

    /// Source address of everything this transceiver sends.
    fn individual_address(&self) -> IndividualAddress;
}

/// Group telegram received from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTelegram {
    /// Sending device
    pub source: IndividualAddress,
    /// Group the telegram was sent to
    pub destination: GroupAddress,
    /// Bus priority
    pub priority: Priority,
    /// Read, response or write
    pub apci: Apci,
    /// Payload; empty for reads
    pub data: ApduData,
    /// Datagram origin on the IP network
    pub sender: SocketAddr,
}

impl GroupTelegram {
    /// Load the payload into a converter.
    ///
    /// # Errors
    ///
    /// DPT error if the payload does not fit the converter's frame.
    pub fn decode_into<C: DptCodec>(&self, converter: &mut DptConverter<C>) -> Result<()> {
        converter.set_frame(&self.data)
    }
}

/// KNXnet/IP routing transceiver.
///
/// Sends through a [`MulticastTransmit`] and listens through a
/// [`MulticastReceive`], each with its own socket. All group addresses share
/// the one bus multicast group, so adding an address makes sure that group is
/// joined and the rest is filtering in [`receive`](Self::receive).
#[derive(Debug)]
pub struct MulticastTransceiver<S: DatagramSocket = UdpSocket> {
    individual_address: IndividualAddress,
    domain_address: Option<DomainAddress>,
    groups: BTreeMap<GroupAddress, bool>,
    receive: MulticastReceive<S>,
    transmit: MulticastTransmit<S>,
}

impl MulticastTransceiver<UdpSocket> {
    /// Open both sockets for `config`.
    ///
    /// # Errors
    ///
    /// Validation error for an invalid configuration, I/O error if a socket
    /// cannot be set up.
    pub fn bind(config: MulticastConfig, individual_address: IndividualAddress) -> Result<Self> {
        config.validate()?;
        let receive = open_receive_socket(&config)?;
        let transmit = open_transmit_socket(&config)?;
        Self::with_sockets(receive, transmit, config, individual_address)
    }
}

impl<S: DatagramSocket> MulticastTransceiver<S> {
    /// Build over already bound sockets.
    ///
    /// # Errors
    ///
    /// Same as [`MulticastTransceiver::bind`].
    pub fn with_sockets(
        receive: S,
        transmit: S,
        config: MulticastConfig,
        individual_address: IndividualAddress,
    ) -> Result<Self> {
        Ok(Self {
            individual_address,
            domain_address: None,
            groups: BTreeMap::new(),
            receive: MulticastReceive::with_socket(receive, config)?,
            transmit: MulticastTransmit::with_socket(transmit, config)?,
        })
    }

    /// Set the domain address.
    #[must_use]
    pub fn with_domain_address(mut self, domain_address: DomainAddress) -> Self {
        self.domain_address = Some(domain_address);
        self
    }

    /// Layer-2 ack flag of a joined group address.
    pub fn group_address_entry(&self, gad: GroupAddress) -> Option<bool> {
        self.groups.get(&gad).copied()
    }

    /// Joined group addresses in ascending order.
    pub fn group_addresses(&self) -> impl Iterator<Item = GroupAddress> + '_ {
        self.groups.keys().copied()
    }

    /// Send a group-value telegram from this device's individual address.
    ///
    /// `data` and `size` follow [`Apdu::group_value`].
    ///
    /// # Errors
    ///
    /// Format error if the APDU cannot be built, transport error if the
    /// datagram cannot be sent.
    pub fn send_group_value(
        &mut self,
        destination: GroupAddress,
        priority: Priority,
        apci: Apci,
        data: &[u8],
        size: usize,
    ) -> Result<()> {
        let apdu = if apci == Apci::GroupValueRead {
            Apdu::group_value_read()
        } else {
            Apdu::group_value(apci, data, size)?
        };
        let cemi = CemiFactory::group_data(
            CEMIMessageCode::LDataInd,
            priority,
            self.individual_address,
            destination,
            &apdu,
        )?;
        let datagram = FrameBuilder::routing_indication(&cemi)?;

        knx_log!(
            debug,
            "{:?} {} -> {} ({:?}, {} bytes)",
            apci,
            self.individual_address,
            destination,
            priority,
            datagram.len()
        );
        self.transmit.transmit(&datagram)
    }

    /// Send a `GroupValueWrite` carrying the converter's current value.
    ///
    /// # Errors
    ///
    /// DPT error if the converter holds no data, otherwise as
    /// [`send_group_value`](Self::send_group_value).
    pub fn write<C: DptCodec>(
        &mut self,
        destination: GroupAddress,
        priority: Priority,
        converter: &DptConverter<C>,
    ) -> Result<()> {
        let frame = converter.frame()?;
        self.send_group_value(destination, priority, Apci::GroupValueWrite, &frame, converter.apdu_size())
    }

    /// Send a `GroupValueResponse` carrying the converter's current value.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn respond<C: DptCodec>(
        &mut self,
        destination: GroupAddress,
        priority: Priority,
        converter: &DptConverter<C>,
    ) -> Result<()> {
        let frame = converter.frame()?;
        self.send_group_value(destination, priority, Apci::GroupValueResponse, &frame, converter.apdu_size())
    }

    /// Send a `GroupValueRead`.
    ///
    /// # Errors
    ///
    /// Transport error if the datagram cannot be sent.
    pub fn read(&mut self, destination: GroupAddress, priority: Priority) -> Result<()> {
        self.send_group_value(destination, priority, Apci::GroupValueRead, &[], 0)
    }

    /// Wait for one datagram and decode it.
    ///
    /// Returns `Ok(None)` for traffic this device does not listen to: other
    /// KNXnet/IP services (search requests, other routing services), non-`L_Data` frames, individually addressed frames,
    /// groups outside the table and services other than read, response and
    /// write.
    ///
    /// # Errors
    ///
    /// [`KnxError::Timeout`] when the bus stayed quiet, format error for a
    /// malformed datagram.
    pub fn receive(&mut self) -> Result<Option<GroupTelegram>> {
        let (datagram, sender) = self.receive.receive()?;
        self.decode(&datagram, sender).inspect_err(|e| {
            knx_log!(warn, "dropping malformed datagram from {}: {}", sender, e);
        })
    }

    fn decode(&self, datagram: &[u8], sender: SocketAddr) -> Result<Option<GroupTelegram>> {
        let frame = match KnxnetIpFrame::parse(datagram) {
            Err(e) if e.is_unsupported_service() => {
                knx_log!(debug, "ignoring non-routing KNXnet/IP service from {}", sender);
                return Ok(None);
            }
            parsed => parsed?,
        };
        if frame.service_type() != ServiceType::RoutingIndication {
            knx_log!(debug, "ignoring {:?} from {}", frame.service_type(), sender);
            return Ok(None);
        }

        let cemi = CEMIFrame::parse(frame.body())?;
        if !cemi.is_ldata() {
            return Ok(None);
        }
        let ldata = cemi.as_ldata()?;

        let Some(destination) = ldata.destination_group() else {
            return Ok(None);
        };
        if !self.groups.contains_key(&destination) {
            knx_log!(trace, "ignoring telegram to foreign group {}", destination);
            return Ok(None);
        }

        let apci = ldata.apci();
        let data = match apci {
            Apci::GroupValueRead => ApduData::new(),
            Apci::GroupValueResponse | Apci::GroupValueWrite => Apdu::group_value_data(ldata.apdu)?,
            Apci::Other(_) => return Ok(None),
        };

        knx_log!(trace, "{:?} {} -> {}", apci, ldata.source, destination);
        Ok(Some(GroupTelegram {
            source: ldata.source,
            destination,
            priority: ldata.priority(),
            apci,
            data,
            sender,
        }))
    }

    /// Receive role
    pub fn receiver(&self) -> &MulticastReceive<S> {
        &self.receive
    }

    /// Transmit role
    pub fn transmitter(&self) -> &MulticastTransmit<S> {
        &self.transmit
    }
}

impl<S: DatagramSocket> Transceiver for MulticastTransceiver<S> {
    fn add_group_address(&mut self, gad: GroupAddress, send_l2_ack: bool) -> Result<()> {
        let group = self.receive.config().multicast_address;
        self.receive.join_group(group)?;
        if self.groups.insert(gad, send_l2_ack).is_none() {
            knx_log!(info, "listening to group address {}", gad);
        }
        Ok(())
    }

    fn remove_group_address(&mut self, gad: GroupAddress) -> Result<()> {
        self.groups
            .remove(&gad)
            .ok_or_else(KnxError::group_address_not_found)?;
        knx_log!(info, "stopped listening to group address {}", gad);
        Ok(())
    }

    fn cleanup(&mut self) {
        if self.receive.is_closed() && self.transmit.is_closed() {
            return;
        }
        self.groups.clear();
        self.receive.close();
        self.transmit.close();
        knx_log!(info, "transceiver {} cleaned up", self.individual_address);
    }

    fn domain_address(&self) -> Option<DomainAddress> {
        self.domain_address
    }

    fn individual_address(&self) -> IndividualAddress {
        self.individual_address
    }
}
