//! ATT PDUs carrying a list of equally sized elements
//!
//! READ_BY_TYPE_RSP and READ_BY_GROUP_TYPE_RSP store the element size in
//! the octet after the opcode; FIND_INFORMATION_RSP stores a format code
//! there instead, from which the size follows. The value segment starting
//! at offset 2 must be a whole number of elements.
//!
//! Outbound lists are built in place: allocate with `with_capacity(max_len)`,
//! fix the element size, fill elements through the setters and finally
//! shrink the PDU with `set_element_count`.
use super::constants::*;
use super::error::{AttError, AttResult};
use super::opcode::AttOpcode;
use super::pdu::{att_pdu, new_pdu, AttPduMessage, AttPduMsg};
use crate::error::OctetError;
use crate::octets::{Octets, OctetsMut};
use crate::uuid::{Uuid, UuidTypeSize};

/// Size arithmetic of element list PDUs
pub trait AttElementList: AttPduMessage {
    fn element_size(&self) -> usize;

    fn element_count(&self) -> usize {
        self.value_size()
            .checked_div(self.element_size())
            .unwrap_or(0)
    }

    fn element_offset(&self, index: usize) -> usize {
        self.value_offset() + index * self.element_size()
    }
}

fn check_elements(
    name: &'static str,
    value_size: usize,
    element_size: usize,
    min_element_size: usize,
) -> AttResult<()> {
    if element_size < min_element_size {
        return Err(AttError::ValueSize {
            name,
            reason: format!(
                "element size {} < minimum {}",
                element_size, min_element_size
            ),
        });
    }
    if value_size % element_size != 0 {
        return Err(AttError::ValueSize {
            name,
            reason: format!(
                "value size {} not multiple of element-size {}",
                value_size, element_size
            ),
        });
    }
    Ok(())
}

fn check_index(list: &dyn AttElementList, index: usize) -> AttResult<()> {
    if index >= list.element_count() {
        return Err(OctetError::IndexOutOfBounds {
            index,
            length: 1,
            size: list.element_count(),
        }
        .into());
    }
    Ok(())
}

/// Builder allocation: `max_len` bytes, all of them in use until finalized.
fn builder_msg(name: &'static str, opcode: AttOpcode, max_len: usize) -> AttResult<AttPduMsg<'static>> {
    if max_len < 2 {
        return Err(AttError::ValueSize {
            name,
            reason: format!("maximum length {} below header size 2", max_len),
        });
    }
    Ok(AttPduMsg::owned(new_pdu(opcode, max_len)?))
}

fn finalize_count(
    msg: &mut AttPduMsg<'_>,
    name: &'static str,
    element_size: usize,
    count: usize,
) -> AttResult<()> {
    let pdu = msg.octets_mut()?;
    let needed = element_size
        .checked_mul(count)
        .and_then(|n| n.checked_add(2))
        .filter(|&n| n <= pdu.capacity())
        .ok_or_else(|| AttError::ValueSize {
            name,
            reason: format!(
                "{} elements of {} bytes exceed capacity {}",
                count,
                element_size,
                pdu.capacity()
            ),
        })?;
    pdu.resize(needed)?;
    Ok(())
}

fn element_size_byte(name: &'static str, size: usize, min: usize) -> AttResult<u8> {
    match u8::try_from(size) {
        Ok(n) if size >= min => Ok(n),
        _ => Err(AttError::ValueSize {
            name,
            reason: format!("element size {} outside {}..=255", size, min),
        }),
    }
}

att_pdu! {
    /// READ_BY_TYPE_RSP: elements of handle(2) + value(element size - 2)
    AttReadByTypeRsp, value_offset = 2, opcodes = [AttOpcode::ReadByTypeRsp],
    validate = check_list
}

impl AttReadByTypeRsp<'static> {
    /// Empty builder of at most `max_len` bytes.
    pub fn with_capacity(max_len: usize) -> AttResult<Self> {
        Ok(Self {
            msg: builder_msg("AttReadByTypeRsp", AttOpcode::ReadByTypeRsp, max_len)?,
        })
    }

    /// Packs the leading run of equally long values that fits in `max_len`.
    ///
    /// Values are cut to `max_len - 4` or 253 bytes, whichever is smaller.
    pub fn from_entries(max_len: usize, entries: &[(u16, &[u8])]) -> AttResult<Self> {
        let mut rsp = Self::with_capacity(max_len)?;
        let Some(&(_, first)) = entries.first() else {
            rsp.set_element_size(2)?;
            rsp.set_element_count(0)?;
            return Ok(rsp);
        };
        let value_len = first.len().min(253).min(max_len.saturating_sub(4));
        let element_size = 2 + value_len;
        rsp.set_element_size(element_size)?;

        let room = (max_len - 2) / element_size;
        let mut count = 0;
        for &(handle, value) in entries.iter().take(room) {
            if value.len() != first.len() {
                break;
            }
            rsp.set_element_handle(count, handle)?;
            rsp.set_element_value(count, &value[..value_len])?;
            count += 1;
        }
        rsp.set_element_count(count)?;
        Ok(rsp)
    }

    pub fn set_element_size(&mut self, element_size: usize) -> AttResult<()> {
        let n = element_size_byte("AttReadByTypeRsp", element_size, 2)?;
        self.msg.octets_mut()?.write_u8(1, n)?;
        Ok(())
    }

    /// Fixes the PDU size to `count` elements.
    pub fn set_element_count(&mut self, count: usize) -> AttResult<()> {
        let element_size = self.element_size();
        finalize_count(&mut self.msg, "AttReadByTypeRsp", element_size, count)
    }

    pub fn set_element_handle(&mut self, index: usize, handle: u16) -> AttResult<()> {
        check_index(self, index)?;
        let offset = self.element_offset(index);
        self.msg.octets_mut()?.write_u16(offset, handle)?;
        Ok(())
    }

    pub fn set_element_value(&mut self, index: usize, value: &[u8]) -> AttResult<()> {
        check_index(self, index)?;
        if value.len() != self.element_size() - 2 {
            return Err(AttError::ValueSize {
                name: "AttReadByTypeRsp",
                reason: format!(
                    "value of {} bytes in element of size {}",
                    value.len(),
                    self.element_size()
                ),
            });
        }
        let offset = self.element_offset(index) + 2;
        self.msg.octets_mut()?.write_bytes(offset, value)?;
        Ok(())
    }
}

impl AttReadByTypeRsp<'_> {
    fn check_list(&self) -> AttResult<()> {
        check_elements("AttReadByTypeRsp", self.value_size(), self.element_size(), 2)
    }

    pub fn element_handle(&self, index: usize) -> AttResult<u16> {
        check_index(self, index)?;
        Ok(self.msg.read_u16(self.element_offset(index))?)
    }

    pub fn element_value(&self, index: usize) -> AttResult<&[u8]> {
        check_index(self, index)?;
        let offset = self.element_offset(index) + 2;
        Ok(self.msg.read_bytes(offset, self.element_size() - 2)?)
    }

    pub fn elements(&self) -> impl Iterator<Item = (u16, &[u8])> + '_ {
        let value_len = self.element_size().saturating_sub(2);
        (0..self.element_count()).map(move |i| {
            let offset = self.element_offset(i);
            (
                self.msg.read_u16_unchecked(offset),
                &self.msg.as_slice()[offset + 2..offset + 2 + value_len],
            )
        })
    }
}

impl AttElementList for AttReadByTypeRsp<'_> {
    fn element_size(&self) -> usize {
        usize::from(self.msg.read_u8_unchecked(1))
    }
}

att_pdu! {
    /// READ_BY_GROUP_TYPE_RSP: elements of start(2) + end(2) + value
    AttReadByGroupTypeRsp, value_offset = 2, opcodes = [AttOpcode::ReadByGroupTypeRsp],
    validate = check_list
}

impl AttReadByGroupTypeRsp<'static> {
    pub fn with_capacity(max_len: usize) -> AttResult<Self> {
        Ok(Self {
            msg: builder_msg("AttReadByGroupTypeRsp", AttOpcode::ReadByGroupTypeRsp, max_len)?,
        })
    }

    /// Packs the leading run of equally long group values that fits in `max_len`.
    pub fn from_entries(max_len: usize, entries: &[(u16, u16, &[u8])]) -> AttResult<Self> {
        let mut rsp = Self::with_capacity(max_len)?;
        let Some(&(_, _, first)) = entries.first() else {
            rsp.set_element_size(4)?;
            rsp.set_element_count(0)?;
            return Ok(rsp);
        };
        let value_len = first.len().min(251).min(max_len.saturating_sub(6));
        let element_size = 4 + value_len;
        rsp.set_element_size(element_size)?;

        let room = (max_len - 2) / element_size;
        let mut count = 0;
        for &(start, end, value) in entries.iter().take(room) {
            if value.len() != first.len() {
                break;
            }
            rsp.set_element_handles(count, start, end)?;
            rsp.set_element_value(count, &value[..value_len])?;
            count += 1;
        }
        rsp.set_element_count(count)?;
        Ok(rsp)
    }

    pub fn set_element_size(&mut self, element_size: usize) -> AttResult<()> {
        let n = element_size_byte("AttReadByGroupTypeRsp", element_size, 4)?;
        self.msg.octets_mut()?.write_u8(1, n)?;
        Ok(())
    }

    pub fn set_element_count(&mut self, count: usize) -> AttResult<()> {
        let element_size = self.element_size();
        finalize_count(&mut self.msg, "AttReadByGroupTypeRsp", element_size, count)
    }

    pub fn set_element_handles(&mut self, index: usize, start: u16, end: u16) -> AttResult<()> {
        check_index(self, index)?;
        let offset = self.element_offset(index);
        let pdu = self.msg.octets_mut()?;
        pdu.write_u16(offset, start)?;
        pdu.write_u16(offset + 2, end)?;
        Ok(())
    }

    pub fn set_element_value(&mut self, index: usize, value: &[u8]) -> AttResult<()> {
        check_index(self, index)?;
        if value.len() != self.element_size() - 4 {
            return Err(AttError::ValueSize {
                name: "AttReadByGroupTypeRsp",
                reason: format!(
                    "value of {} bytes in element of size {}",
                    value.len(),
                    self.element_size()
                ),
            });
        }
        let offset = self.element_offset(index) + 4;
        self.msg.octets_mut()?.write_bytes(offset, value)?;
        Ok(())
    }
}

impl AttReadByGroupTypeRsp<'_> {
    fn check_list(&self) -> AttResult<()> {
        check_elements("AttReadByGroupTypeRsp", self.value_size(), self.element_size(), 4)
    }

    pub fn element_start_handle(&self, index: usize) -> AttResult<u16> {
        check_index(self, index)?;
        Ok(self.msg.read_u16(self.element_offset(index))?)
    }

    pub fn element_end_handle(&self, index: usize) -> AttResult<u16> {
        check_index(self, index)?;
        Ok(self.msg.read_u16(self.element_offset(index) + 2)?)
    }

    pub fn element_value(&self, index: usize) -> AttResult<&[u8]> {
        check_index(self, index)?;
        let offset = self.element_offset(index) + 4;
        Ok(self.msg.read_bytes(offset, self.element_size() - 4)?)
    }
}

impl AttElementList for AttReadByGroupTypeRsp<'_> {
    fn element_size(&self) -> usize {
        usize::from(self.msg.read_u8_unchecked(1))
    }
}

att_pdu! {
    /// FIND_INFORMATION_RSP: elements of handle(2) + UUID, the UUID width
    /// given by the format octet
    AttFindInfoRsp, value_offset = 2, opcodes = [AttOpcode::FindInformationRsp],
    validate = check_list
}

fn format_for(type_size: UuidTypeSize) -> AttResult<u8> {
    match type_size {
        UuidTypeSize::Uuid16 => Ok(ATT_FIND_INFO_RSP_FORMAT_16BIT),
        UuidTypeSize::Uuid128 => Ok(ATT_FIND_INFO_RSP_FORMAT_128BIT),
        UuidTypeSize::Uuid32 => Err(AttError::ValueSize {
            name: "AttFindInfoRsp",
            reason: "32 bit UUIDs have no find information format".into(),
        }),
    }
}

impl AttFindInfoRsp<'static> {
    pub fn with_capacity(max_len: usize) -> AttResult<Self> {
        Ok(Self {
            msg: builder_msg("AttFindInfoRsp", AttOpcode::FindInformationRsp, max_len)?,
        })
    }

    /// Packs the leading run of same-width UUIDs that fits in `max_len`.
    ///
    /// 32 bit UUIDs are carried in 128 bit form.
    pub fn from_entries(max_len: usize, entries: &[(u16, Uuid)]) -> AttResult<Self> {
        let wire_width = |uuid: &Uuid| match uuid.type_size() {
            UuidTypeSize::Uuid16 => UuidTypeSize::Uuid16,
            _ => UuidTypeSize::Uuid128,
        };
        let mut rsp = Self::with_capacity(max_len)?;
        let width = entries
            .first()
            .map_or(UuidTypeSize::Uuid16, |(_, uuid)| wire_width(uuid));
        rsp.set_uuid_format(width)?;

        let room = (max_len - 2) / rsp.element_size();
        let mut count = 0;
        for (handle, uuid) in entries.iter().take(room) {
            if wire_width(uuid) != width {
                break;
            }
            rsp.set_element_handle(count, *handle)?;
            rsp.set_element_uuid(count, uuid)?;
            count += 1;
        }
        rsp.set_element_count(count)?;
        Ok(rsp)
    }

    pub fn set_uuid_format(&mut self, type_size: UuidTypeSize) -> AttResult<()> {
        let format = format_for(type_size)?;
        self.msg.octets_mut()?.write_u8(1, format)?;
        Ok(())
    }

    /// Sets the format matching `element_size`, 4 or 18.
    pub fn set_element_size(&mut self, element_size: usize) -> AttResult<()> {
        let type_size = element_size
            .checked_sub(2)
            .and_then(|n| UuidTypeSize::for_byte_count(n).ok())
            .ok_or_else(|| AttError::ValueSize {
                name: "AttFindInfoRsp",
                reason: format!("element size {}, expected 4 or 18", element_size),
            })?;
        self.set_uuid_format(type_size)
    }

    pub fn set_element_count(&mut self, count: usize) -> AttResult<()> {
        let element_size = self.element_size();
        finalize_count(&mut self.msg, "AttFindInfoRsp", element_size, count)
    }

    pub fn set_element_handle(&mut self, index: usize, handle: u16) -> AttResult<()> {
        check_index(self, index)?;
        let offset = self.element_offset(index);
        self.msg.octets_mut()?.write_u16(offset, handle)?;
        Ok(())
    }

    /// Writes `uuid` in the list's format, expanding short UUIDs for 128 bit lists.
    pub fn set_element_uuid(&mut self, index: usize, uuid: &Uuid) -> AttResult<()> {
        check_index(self, index)?;
        let uuid = match (self.uuid_format()?, uuid.type_size()) {
            (UuidTypeSize::Uuid128, UuidTypeSize::Uuid128) | (UuidTypeSize::Uuid16, UuidTypeSize::Uuid16) => *uuid,
            (UuidTypeSize::Uuid128, _) => uuid.to_uuid128(),
            (_, other) => {
                return Err(AttError::ValueSize {
                    name: "AttFindInfoRsp",
                    reason: format!("{:?} UUID in 16 bit list", other),
                })
            }
        };
        let offset = self.element_offset(index) + 2;
        self.msg.octets_mut()?.write_uuid(offset, &uuid)?;
        Ok(())
    }
}

impl AttFindInfoRsp<'_> {
    fn check_list(&self) -> AttResult<()> {
        self.uuid_format()?;
        check_elements("AttFindInfoRsp", self.value_size(), self.element_size(), 4)
    }

    pub fn format(&self) -> u8 {
        self.msg.read_u8_unchecked(1)
    }

    pub fn uuid_format(&self) -> AttResult<UuidTypeSize> {
        match self.format() {
            ATT_FIND_INFO_RSP_FORMAT_16BIT => Ok(UuidTypeSize::Uuid16),
            ATT_FIND_INFO_RSP_FORMAT_128BIT => Ok(UuidTypeSize::Uuid128),
            format => Err(AttError::InvalidFormat {
                name: "AttFindInfoRsp",
                format,
            }),
        }
    }

    pub fn element_handle(&self, index: usize) -> AttResult<u16> {
        check_index(self, index)?;
        Ok(self.msg.read_u16(self.element_offset(index))?)
    }

    pub fn element_uuid(&self, index: usize) -> AttResult<Uuid> {
        check_index(self, index)?;
        let type_size = self.uuid_format()?;
        Ok(self.msg.read_uuid(self.element_offset(index) + 2, type_size)?)
    }
}

impl AttElementList for AttFindInfoRsp<'_> {
    fn element_size(&self) -> usize {
        match self.uuid_format() {
            Ok(type_size) => 2 + type_size.byte_count(),
            Err(_) => 0,
        }
    }
}
