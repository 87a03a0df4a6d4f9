use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(windows)] {
        mod windows {
            use std::io;
            use log::error;
            use ::windows::Win32::System::SystemInformation::{GetSystemFirmwareTable, RSMB};

            /// Size of the RawSMBIOSData header preceding the table in the 'RSMB' blob
            /// (calling method, major, minor, DMI revision, u32 length).
            pub const RAW_SMBIOS_HEADER: usize = 8;

            /// Returns the raw 'RSMB' firmware table, header included.
            pub fn read_firmware_table() -> io::Result<Vec<u8>> {
                // Step 1: get required size
                let size = unsafe { GetSystemFirmwareTable(RSMB, 0, None) };
                if size == 0 {
                    error!("Failed to get system firmware table size (RSMB)");
                    return Err(io::Error::last_os_error());
                }

                // Step 2: retrieve table
                let mut buffer = vec![0u8; size as usize];
                let ret = unsafe { GetSystemFirmwareTable(RSMB, 0, Some(&mut buffer[..])) };
                if ret != size {
                    error!("Failed to get system firmware table (RSMB): got {} of {} bytes", ret, size);
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short RSMB read"));
                }

                Ok(buffer)
            }
        }

        pub use self::windows::*;
    } else if #[cfg(unix)] {
        mod unix {
            use std::fs::File;
            use std::io;
            use std::os::unix::io::AsRawFd;

            pub fn getpagesize() -> usize {
                unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
            }

            /// Read-only shared mapping of a file region, unmapped on drop.
            ///
            /// The underlying mapping starts on a page boundary; `as_slice` hides the
            /// leading alignment bytes so the view starts at the requested offset.
            pub struct Mapping {
                base: *mut libc::c_void,
                len: usize,
                offset: usize,
            }

            impl Mapping {
                /// Maps `length` bytes of `file` starting at `address`.
                pub fn map_readonly(file: &File, address: u64, length: usize) -> io::Result<Mapping> {
                    let page = getpagesize() as u64;
                    let align = (address % page) as usize;
                    let map_len = length
                        .checked_add(align)
                        .filter(|&len| len > 0)
                        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "bad mapping length"))?;
                    let map_offset = libc::off_t::try_from(address - align as u64)
                        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "address out of range"))?;

                    let base = unsafe {
                        libc::mmap(
                            std::ptr::null_mut(),
                            map_len,
                            libc::PROT_READ,
                            libc::MAP_SHARED,
                            file.as_raw_fd(),
                            map_offset,
                        )
                    };
                    if base == libc::MAP_FAILED {
                        return Err(io::Error::last_os_error());
                    }

                    Ok(Mapping { base, len: map_len, offset: align })
                }

                pub fn as_slice(&self) -> &[u8] {
                    // SAFETY: `base` is a live PROT_READ mapping of `len` bytes and
                    // `offset <= len` by construction.
                    unsafe {
                        std::slice::from_raw_parts(
                            (self.base as *const u8).add(self.offset),
                            self.len - self.offset,
                        )
                    }
                }
            }

            impl Drop for Mapping {
                fn drop(&mut self) {
                    unsafe {
                        libc::munmap(self.base, self.len);
                    }
                }
            }
        }

        pub use self::unix::*;
    }
}
