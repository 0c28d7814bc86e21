//! Go build information embedded in compiled binaries
//!
//! The Go linker stores the module listing behind a `\xff Go buildinf:`
//! marker, in its own section (`.go.buildinfo` on ELF, `__go_buildinfo` on
//! Mach-O) or in the writable data of the image. Go 1.18 and later inline
//! both strings after the 32-byte header. Older toolchains store pointers to
//! Go string headers instead, resolved through the binary's segment table.

use crate::{GolicenseError, GolicenseResult};
use goblin::elf::program_header::{PF_W, PT_LOAD};
use goblin::mach::Mach;
use goblin::Object;
use std::ops::Range;

const MAGIC: &[u8] = b"\xff Go buildinf:";
const HEADER_LEN: usize = 32;
const FLAG_BIG_ENDIAN: u8 = 0x1;
const FLAG_INLINE: u8 = 0x2;
/// Markers the linker wraps around the module listing
const SENTINEL_LEN: usize = 16;

/// Build information read from a Go binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    /// Toolchain version, e.g. `go1.22.1`
    pub go_version: String,
    /// Module listing in the `path` / `mod` / `dep` / `=>` row format
    pub modules: String,
}

/// One loaded range of the image: virtual address → file offset.
#[derive(Debug, Clone, Copy)]
struct Region {
    addr: u64,
    offset: u64,
    size: u64,
}

#[derive(Default)]
struct Layout {
    /// File ranges the marker is expected in, most specific first
    windows: Vec<Range<usize>>,
    regions: Vec<Region>,
}

/// Whether `data` carries a Go build information marker.
pub fn is_go_binary(data: &[u8]) -> bool {
    marker_positions(data, 0..data.len()).next().is_some()
}

/// Extract the build information of a Go executable (ELF, Mach-O or PE).
pub fn read_build_info(data: &[u8]) -> GolicenseResult<BuildInfo> {
    let layout = layout(data);
    let windows = layout.windows.iter().cloned().chain(std::iter::once(0..data.len()));

    for window in windows {
        for pos in marker_positions(data, window) {
            match decode(data, pos, &layout.regions) {
                Some(info) => return Ok(info),
                None => tracing::debug!("ignoring unreadable build info marker at {:#x}", pos),
            }
        }
    }

    Err(GolicenseError::Binary(
        "no readable Go build information (not a Go binary, or built by an unsupported toolchain)".into(),
    ))
}

fn layout(data: &[u8]) -> Layout {
    let mut layout = Layout::default();

    match Object::parse(data) {
        Ok(Object::Elf(elf)) => {
            for section in &elf.section_headers {
                if elf.shdr_strtab.get_at(section.sh_name) == Some(".go.buildinfo") {
                    layout.windows.push(file_range(section.sh_offset, section.sh_size));
                }
            }
            for segment in &elf.program_headers {
                if segment.p_type != PT_LOAD {
                    continue;
                }
                layout.regions.push(Region {
                    addr: segment.p_vaddr,
                    offset: segment.p_offset,
                    size: segment.p_filesz,
                });
                if segment.p_flags & PF_W != 0 {
                    layout.windows.push(file_range(segment.p_offset, segment.p_filesz));
                }
            }
        }
        Ok(Object::Mach(Mach::Binary(macho))) => {
            for segment in macho.segments.iter() {
                layout.regions.push(Region {
                    addr: segment.vmaddr,
                    offset: segment.fileoff,
                    size: segment.filesize,
                });
                if let Ok(sections) = segment.sections() {
                    for (section, _) in sections {
                        if section.name().ok() == Some("__go_buildinfo") {
                            layout.windows.push(file_range(u64::from(section.offset), section.size));
                        }
                    }
                }
                if segment.name().ok() == Some("__DATA") {
                    layout.windows.push(file_range(segment.fileoff, segment.filesize));
                }
            }
        }
        Ok(Object::PE(pe)) => {
            let base = pe.image_base as u64;
            for section in &pe.sections {
                let offset = u64::from(section.pointer_to_raw_data);
                let size = u64::from(section.size_of_raw_data);
                layout.regions.push(Region {
                    addr: base + u64::from(section.virtual_address),
                    offset,
                    size,
                });
                if section.name().ok() == Some(".data") {
                    layout.windows.push(file_range(offset, size));
                }
            }
        }
        Ok(_) => tracing::debug!("unsupported object format, scanning the whole file"),
        Err(e) => tracing::debug!("unparseable object file ({}), scanning the whole file", e),
    }

    layout
}

fn file_range(offset: u64, size: u64) -> Range<usize> {
    let start = usize::try_from(offset).unwrap_or(usize::MAX);
    let len = usize::try_from(size).unwrap_or(usize::MAX);
    start..start.saturating_add(len)
}

fn marker_positions(data: &[u8], window: Range<usize>) -> impl Iterator<Item = usize> + '_ {
    let end = window.end.min(data.len());
    let start = window.start.min(end);
    data[start..end]
        .windows(MAGIC.len())
        .enumerate()
        .filter(|(_, bytes)| *bytes == MAGIC)
        .map(move |(i, _)| start + i)
}

fn decode(data: &[u8], pos: usize, regions: &[Region]) -> Option<BuildInfo> {
    let header = data.get(pos..pos.checked_add(HEADER_LEN)?)?;
    let ptr_size = usize::from(header[14]);
    let flags = header[15];

    let (version, modules) = if flags & FLAG_INLINE != 0 {
        let rest = &data[pos + HEADER_LEN..];
        let (version, used) = inline_string(rest)?;
        let (modules, _) = inline_string(&rest[used..])?;
        (version, modules)
    } else {
        if ptr_size != 4 && ptr_size != 8 {
            return None;
        }
        let image = Image {
            data,
            regions,
            ptr_size,
            big_endian: flags & FLAG_BIG_ENDIAN != 0,
        };
        let version_addr = image.word(&header[16..16 + ptr_size]);
        let modules_addr = image.word(&header[16 + ptr_size..16 + 2 * ptr_size]);
        (image.string(version_addr)?, image.string(modules_addr)?)
    };

    Some(BuildInfo {
        go_version: String::from_utf8_lossy(version).into_owned(),
        modules: String::from_utf8_lossy(strip_sentinels(modules)).into_owned(),
    })
}

/// Length-prefixed string; returns it and the bytes consumed.
fn inline_string(buf: &[u8]) -> Option<(&[u8], usize)> {
    let (len, used) = uvarint(buf)?;
    let end = used.checked_add(usize::try_from(len).ok()?)?;
    Some((buf.get(used..end)?, end))
}

fn uvarint(buf: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in buf.iter().enumerate().take(10) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

fn strip_sentinels(modules: &[u8]) -> &[u8] {
    let len = modules.len();
    if len > 2 * SENTINEL_LEN && modules[len - SENTINEL_LEN - 1] == b'\n' {
        &modules[SENTINEL_LEN..len - SENTINEL_LEN]
    } else {
        modules
    }
}

/// Reads through the image's virtual address space.
struct Image<'a> {
    data: &'a [u8],
    regions: &'a [Region],
    ptr_size: usize,
    big_endian: bool,
}

impl<'a> Image<'a> {
    fn word(&self, bytes: &[u8]) -> u64 {
        let mut buf = [0u8; 8];
        if self.big_endian {
            buf[8 - bytes.len()..].copy_from_slice(bytes);
            u64::from_be_bytes(buf)
        } else {
            buf[..bytes.len()].copy_from_slice(bytes);
            u64::from_le_bytes(buf)
        }
    }

    fn read(&self, addr: u64, len: u64) -> Option<&'a [u8]> {
        let region = self
            .regions
            .iter()
            .find(|r| addr >= r.addr && addr - r.addr < r.size)?;
        let rel = addr - region.addr;
        if rel.checked_add(len)? > region.size {
            return None;
        }
        let start = usize::try_from(region.offset.checked_add(rel)?).ok()?;
        let end = start.checked_add(usize::try_from(len).ok()?)?;
        self.data.get(start..end)
    }

    /// Go string header (data pointer, length) at `addr`, then its bytes.
    fn string(&self, addr: u64) -> Option<&'a [u8]> {
        let header = self.read(addr, 2 * self.ptr_size as u64)?;
        let data_addr = self.word(&header[..self.ptr_size]);
        let len = self.word(&header[self.ptr_size..]);
        self.read(data_addr, len)
    }
}
