//! Simulated sensor speaking the wire protocol over an in-memory transport

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;

use zfm::{Sensor, SensorConfig};
use zfm_core::{chunk, constants::transfer, Command, ConfirmationCode, Packet, PacketType};
use zfm_transport::{Error, Result, Transport};

pub type Shared = Arc<Mutex<SimState>>;

/// Packed image a finger leaves in the image buffer
pub fn image_of(finger: u8) -> Vec<u8> {
    vec![finger; transfer::IMAGE_SIZE]
}

/// Character file extracted from a finger
pub fn features(finger: u8, size: usize) -> Vec<u8> {
    (0..size).map(|i| (i as u8).wrapping_mul(31) ^ finger).collect()
}

pub enum UploadTarget {
    Buffer(usize),
    Image,
}

pub struct SimState {
    pub address: u32,
    pub password: u32,
    pub library_size: u16,
    pub template_size: usize,
    pub packet_size: usize,
    pub random: u32,

    /// Finger currently on the sensor
    pub finger: Option<u8>,
    pub image: Option<Vec<u8>>,
    pub buffers: [Option<Vec<u8>>; 2],
    pub templates: BTreeMap<u16, Vec<u8>>,
    pub notepad: [[u8; 32]; 16],

    /// Reads time out even when a response is queued
    pub stall: bool,
    /// Break the checksum of the next response
    pub corrupt_next: bool,
    /// Send a packet from another address ahead of every response
    pub foreign_before_ack: bool,
    pub fail_writes: bool,

    pub open: bool,
    pub commands: Vec<Command>,
    /// Commands that arrived while a previous response was still unread
    pub interleaved: usize,
    pub max_data_payload: usize,
    pub clears: usize,

    pub outbox: VecDeque<u8>,
    pub upload: Option<(UploadTarget, Vec<u8>)>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            address: 0xFFFF_FFFF,
            password: 0,
            library_size: 200,
            template_size: transfer::CHARACTERISTICS_SIZE,
            packet_size: 128,
            random: 0x1234_5678,
            finger: None,
            image: None,
            buffers: [None, None],
            templates: BTreeMap::new(),
            notepad: [[0; 32]; 16],
            stall: false,
            corrupt_next: false,
            foreign_before_ack: false,
            fail_writes: false,
            open: false,
            commands: Vec::new(),
            interleaved: 0,
            max_data_payload: 0,
            clears: 0,
            outbox: VecDeque::new(),
            upload: None,
        }
    }
}

impl SimState {
    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    fn push_packet(&mut self, packet_type: PacketType, address: u32, payload: Vec<u8>) {
        let packet = Packet::new(packet_type, address, payload).unwrap();
        self.outbox.extend(packet.encode());
    }

    /// Queue an acknowledge as if the sensor had just answered
    pub fn ack(&mut self, code: ConfirmationCode, parameters: &[u8]) {
        if self.foreign_before_ack {
            self.push_packet(PacketType::Ack, self.address ^ 0x0101_0101, vec![0x00]);
        }

        let mut payload = vec![code.code()];
        payload.extend_from_slice(parameters);
        let start = self.outbox.len();
        self.push_packet(PacketType::Ack, self.address, payload);

        if self.corrupt_next {
            self.corrupt_next = false;
            let last = self.outbox.len() - 1;
            debug_assert!(last > start);
            self.outbox[last] ^= 0xFF;
        }
    }

    fn send_data(&mut self, data: Vec<u8>) {
        let chunks: Vec<_> = chunk::split(&data, self.packet_size)
            .unwrap()
            .map(|(packet_type, payload)| (packet_type, payload.to_vec()))
            .collect();
        for (packet_type, payload) in chunks {
            self.push_packet(packet_type, self.address, payload);
        }
    }

    fn handle(&mut self, packet: Packet) {
        if packet.address != self.address {
            return;
        }

        match packet.packet_type {
            PacketType::Command => {
                if !self.outbox.is_empty() {
                    self.interleaved += 1;
                }
                let command = Command::try_from(packet.payload[0]).unwrap();
                self.commands.push(command);
                self.respond(command, &packet.payload[1..]);
            }
            PacketType::Data | PacketType::EndData => {
                self.max_data_payload = self.max_data_payload.max(packet.payload.len());
                if let Some((_, data)) = self.upload.as_mut() {
                    data.extend_from_slice(&packet.payload);
                }
                if packet.is_end_data() {
                    match self.upload.take() {
                        Some((UploadTarget::Buffer(b), data)) => self.buffers[b] = Some(data),
                        Some((UploadTarget::Image, data)) => self.image = Some(data),
                        None => {}
                    }
                }
            }
            PacketType::Ack => {}
        }
    }

    fn respond(&mut self, command: Command, params: &[u8]) {
        use ConfirmationCode as C;

        let buffer = |id: u8| usize::from(id) - 1;

        match command {
            Command::GenImg => match self.finger {
                Some(finger) => {
                    self.image = Some(image_of(finger));
                    self.ack(C::Success, &[]);
                }
                None => self.ack(C::NoFinger, &[]),
            },
            Command::Img2Tz => match self.image.as_ref().map(|img| img[0]) {
                Some(finger) => {
                    self.buffers[buffer(params[0])] = Some(features(finger, self.template_size));
                    self.ack(C::Success, &[]);
                }
                None => self.ack(C::NoValidImage, &[]),
            },
            Command::RegModel => match &self.buffers {
                [Some(a), Some(b)] if a == b => {
                    let template = a.clone();
                    self.buffers = [Some(template.clone()), Some(template)];
                    self.ack(C::Success, &[]);
                }
                _ => self.ack(C::CombineFailed, &[]),
            },
            Command::Match => match &self.buffers {
                [Some(a), Some(b)] if a == b => self.ack(C::Success, &[0x00, 0x96]),
                _ => self.ack(C::NoMatch, &[0x00, 0x00]),
            },
            Command::Search => {
                let start = BigEndian::read_u16(&params[1..3]);
                let count = BigEndian::read_u16(&params[3..5]);
                let wanted = self.buffers[buffer(params[0])].clone();

                let hit = wanted.and_then(|wanted| {
                    self.templates
                        .range(start..start.saturating_add(count))
                        .find(|(_, template)| **template == wanted)
                        .map(|(slot, _)| *slot)
                });
                match hit {
                    Some(slot) => {
                        let mut found = [0u8; 4];
                        BigEndian::write_u16(&mut found[0..2], slot);
                        BigEndian::write_u16(&mut found[2..4], 120);
                        self.ack(C::Success, &found);
                    }
                    None => self.ack(C::NotFound, &[0; 4]),
                }
            }
            Command::Store => {
                let slot = BigEndian::read_u16(&params[1..3]);
                match self.buffers[buffer(params[0])].clone() {
                    Some(template) if slot < self.library_size => {
                        self.templates.insert(slot, template);
                        self.ack(C::Success, &[]);
                    }
                    Some(_) => self.ack(C::SlotOutOfRange, &[]),
                    None => self.ack(C::FlashWriteError, &[]),
                }
            }
            Command::LoadChar => {
                let slot = BigEndian::read_u16(&params[1..3]);
                match self.templates.get(&slot).cloned() {
                    Some(template) => {
                        self.buffers[buffer(params[0])] = Some(template);
                        self.ack(C::Success, &[]);
                    }
                    None => self.ack(C::TemplateReadError, &[]),
                }
            }
            Command::UpChar => match self.buffers[buffer(params[0])].clone() {
                Some(data) => {
                    self.ack(C::Success, &[]);
                    self.send_data(data);
                }
                None => self.ack(C::UploadFeaturesFailed, &[]),
            },
            Command::DownChar => {
                self.upload = Some((UploadTarget::Buffer(buffer(params[0])), Vec::new()));
                self.ack(C::Success, &[]);
            }
            Command::UpImage => match self.image.clone() {
                Some(data) => {
                    self.ack(C::Success, &[]);
                    self.send_data(data);
                }
                None => self.ack(C::NoValidImage, &[]),
            },
            Command::DownImage => {
                self.upload = Some((UploadTarget::Image, Vec::new()));
                self.ack(C::Success, &[]);
            }
            Command::DeletChar => {
                let start = BigEndian::read_u16(&params[0..2]);
                let count = BigEndian::read_u16(&params[2..4]);
                self.templates
                    .retain(|slot, _| *slot < start || *slot >= start.saturating_add(count));
                self.ack(C::Success, &[]);
            }
            Command::Empty => {
                self.templates.clear();
                self.ack(C::Success, &[]);
            }
            Command::ReadSysPara => {
                let mut raw = [0u8; 16];
                BigEndian::write_u16(&mut raw[0..2], 0x0004);
                BigEndian::write_u16(&mut raw[2..4], 0x0009);
                BigEndian::write_u16(&mut raw[4..6], self.library_size);
                BigEndian::write_u16(&mut raw[6..8], 3);
                BigEndian::write_u32(&mut raw[8..12], self.address);
                BigEndian::write_u16(&mut raw[12..14], 2);
                BigEndian::write_u16(&mut raw[14..16], 6);
                self.ack(C::Success, &raw);
            }
            Command::SetPwd => {
                self.password = BigEndian::read_u32(params);
                self.ack(C::Success, &[]);
            }
            Command::VfyPwd => {
                if BigEndian::read_u32(params) == self.password {
                    self.ack(C::Success, &[]);
                } else {
                    self.ack(C::WrongPassword, &[]);
                }
            }
            Command::GetRandomCode => {
                let mut raw = [0u8; 4];
                BigEndian::write_u32(&mut raw, self.random);
                self.ack(C::Success, &raw);
            }
            Command::SetAddr => {
                self.address = BigEndian::read_u32(params);
                self.ack(C::Success, &[]);
            }
            Command::WriteNotepad => match self.notepad.get_mut(usize::from(params[0])) {
                Some(page) => {
                    page.copy_from_slice(&params[1..33]);
                    self.ack(C::Success, &[]);
                }
                None => self.ack(C::WrongNotepadPage, &[]),
            },
            Command::ReadNotepad => match self.notepad.get(usize::from(params[0])).copied() {
                Some(page) => self.ack(C::Success, &page),
                None => self.ack(C::WrongNotepadPage, &[]),
            },
            Command::TemplateNum => {
                let mut raw = [0u8; 2];
                BigEndian::write_u16(&mut raw, self.templates.len() as u16);
                self.ack(C::Success, &raw);
            }
            Command::ReadConList => {
                let first = u16::from(params[0]) * 256;
                let mut bits = [0u8; 32];
                for slot in self.templates.keys() {
                    if let Some(offset) = slot.checked_sub(first).map(usize::from) {
                        if offset < 256 {
                            bits[offset / 8] |= 1 << (offset % 8);
                        }
                    }
                }
                self.ack(C::Success, &bits);
            }
        }
    }
}

pub struct SimTransport {
    state: Shared,
    connected: bool,
}

#[async_trait]
impl Transport for SimTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Err(Error::AlreadyConnected);
        }
        self.connected = true;
        self.state.lock().unwrap().open = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        let mut state = self.state.lock().unwrap();
        state.open = false;
        state.outbox.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(Error::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)));
        }

        let packet = Packet::decode(data).expect("host sent a malformed packet");
        state.handle(packet);
        Ok(())
    }

    async fn read_exact(&mut self, len: usize, timeout: Duration) -> Result<Bytes> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        tokio::task::yield_now().await;

        {
            let mut state = self.state.lock().unwrap();
            if !state.stall && state.outbox.len() >= len {
                let bytes: Vec<u8> = state.outbox.drain(..len).collect();
                return Ok(Bytes::from(bytes));
            }
        }

        tokio::time::sleep(timeout).await;
        Err(Error::ReadTimeout(timeout))
    }

    async fn clear_input(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.clears += 1;
        state.outbox.clear();
        Ok(())
    }

    fn name(&self) -> String {
        "simulated".to_string()
    }
}

pub fn sensor_with(config: SensorConfig, state: SimState) -> (Sensor, Shared) {
    let shared = Arc::new(Mutex::new(state));
    (sensor_on(config, &shared), shared)
}

/// Another host attached to an already simulated sensor
pub fn sensor_on(config: SensorConfig, shared: &Shared) -> Sensor {
    let transport = SimTransport {
        state: shared.clone(),
        connected: false,
    };

    Sensor::with_transport(Box::new(transport), config).unwrap()
}

pub async fn connected_sensor() -> (Sensor, Shared) {
    let (sensor, shared) = sensor_with(SensorConfig::default(), SimState::default());
    sensor.connect().await.unwrap();
    (sensor, shared)
}
