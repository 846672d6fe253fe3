//! Feature report ioctl of the Linux hidraw driver.

use std::fs::File;
use std::io;

#[cfg(target_os = "linux")]
mod ioctl {
    use nix::ioctl_readwrite_buf;

    // From linux/hidraw.h
    const HIDRAW_IOC_MAGIC: u8 = b'H';
    const HIDRAW_SET_FEATURE: u8 = 0x06;

    // HIDIOCSFEATURE(len): _IOC(_IOC_WRITE | _IOC_READ, 'H', 0x06, len)
    ioctl_readwrite_buf!(
        hidraw_ioc_set_feature,
        HIDRAW_IOC_MAGIC,
        HIDRAW_SET_FEATURE,
        u8
    );
}

#[cfg(target_os = "linux")]
pub fn set_feature_report(file: &File, report: &[u8]) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    let mut buf = report.to_vec();
    // SAFETY: the fd is owned by `file` and stays open for the call, and the
    // kernel reads at most `buf.len()` bytes, which is encoded in the request.
    unsafe { ioctl::hidraw_ioc_set_feature(file.as_raw_fd(), &mut buf) }
        .map_err(io::Error::from)?;

    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_feature_report(_file: &File, _report: &[u8]) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "hidraw feature reports are only available on Linux",
    ))
}
