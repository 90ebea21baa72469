use kernel_alloc::{MemoryMapError, PageFrameAllocator};
use kernel_info::efi::{EfiMemoryDescriptor, EfiMemoryType, MemoryMap};
use kernel_memory_addresses::PhysicalAddress;

const MIB: u64 = 1024 * 1024;
const STRIDE: usize = 48;

fn desc(typ: EfiMemoryType, phys: u64, bytes: u64) -> EfiMemoryDescriptor {
    EfiMemoryDescriptor {
        typ: typ as u32,
        phys_start: phys,
        virt_start: 0,
        page_count: bytes / 4096,
        attributes: 0,
    }
}

fn encode(descs: &[EfiMemoryDescriptor]) -> Vec<u8> {
    let mut buf = vec![0u8; descs.len() * STRIDE];
    for (i, d) in descs.iter().enumerate() {
        d.encode(&mut buf[i * STRIDE..]);
    }
    buf
}

/// Builds the allocator with its bitmap in `ram`, recording the base it chose.
fn init<'r>(
    map: &MemoryMap<'_>,
    ram: &'r mut [u8],
    placed: &mut Option<PhysicalAddress>,
) -> Result<PageFrameAllocator<'r>, MemoryMapError> {
    PageFrameAllocator::from_memory_map(map, move |base, len| {
        *placed = Some(base);
        &mut ram[..len]
    })
}

fn ram() -> Vec<u8> {
    vec![0xCC; 64 * 1024]
}

#[test]
fn cold_boot_reserved_region_is_never_handed_out() {
    let raw = encode(&[
        desc(EfiMemoryType::Conventional, 0, 64 * MIB),
        desc(EfiMemoryType::Reserved, 64 * MIB, 2 * MIB),
    ]);
    let map = MemoryMap::new(&raw, STRIDE);

    let mut ram = ram();
    let mut alloc = init(&map, &mut ram, &mut None).unwrap();

    let total = 66 * MIB;
    let bitmap_bytes = (total / 4096 / 8 + 1) as u64;
    let bitmap_pages = bitmap_bytes / 4096 + 1;

    assert_eq!(alloc.total_bytes(), total);
    assert_eq!(alloc.reserved_bytes(), 2 * MIB);
    assert_eq!(alloc.used_bytes(), bitmap_pages * 4096);
    assert!(alloc.used_bytes() + alloc.reserved_bytes() >= 2 * MIB + bitmap_bytes);

    let mut count = 0u64;
    while let Some(p) = alloc.request_page() {
        assert!(p.as_u64() < 64 * MIB, "handed out {p} from the reserved region");
        assert!(p.as_u64() >= bitmap_pages * 4096, "handed out the bitmap's own page {p}");
        count += 1;
    }
    assert_eq!(count, 64 * MIB / 4096 - bitmap_pages);
    assert_eq!(alloc.free_bytes(), 0);
}

#[test]
fn bitmap_goes_to_the_largest_conventional_region() {
    let raw = encode(&[
        desc(EfiMemoryType::Conventional, 0x1000, MIB),
        desc(EfiMemoryType::LoaderCode, 0x10_0000, MIB),
        desc(EfiMemoryType::Conventional, 0x20_0000, 8 * MIB),
        desc(EfiMemoryType::Conventional, 0xA0_0000, 8 * MIB),
    ]);
    let map = MemoryMap::new(&raw, STRIDE);

    let mut ram = ram();
    let mut placed = None;
    let alloc = init(&map, &mut ram, &mut placed).unwrap();
    assert_eq!(alloc.reserved_bytes(), 1024 * 1024);
    assert_eq!(placed, Some(PhysicalAddress::new(0x20_0000)));
}

#[test]
fn loader_regions_are_reserved_and_bitmap_locked() {
    let raw = encode(&[
        desc(EfiMemoryType::BootServicesData, 0, MIB),
        desc(EfiMemoryType::Conventional, MIB, 4 * MIB),
    ]);
    let map = MemoryMap::new(&raw, STRIDE);

    let mut ram = ram();
    let mut alloc = init(&map, &mut ram, &mut None).unwrap();
    assert!(alloc.is_locked(PhysicalAddress::new(0)));
    assert!(alloc.is_locked(PhysicalAddress::new(MIB)));
    assert!(!alloc.is_locked(PhysicalAddress::new(MIB + 4096)));
    assert_eq!(alloc.request_page(), Some(PhysicalAddress::new(MIB + 4096)));
}

#[test]
fn map_without_conventional_memory_is_rejected() {
    let raw = encode(&[desc(EfiMemoryType::Reserved, 0, MIB)]);
    let map = MemoryMap::new(&raw, STRIDE);
    let mut ram = ram();
    let err = init(&map, &mut ram, &mut None).err();
    assert_eq!(err, Some(MemoryMapError::NoConventionalMemory));
}

#[test]
fn bitmap_must_fit_its_region() {
    // 4 GiB tracked needs a 128 KiB bitmap; the only free region has 4 KiB.
    let raw = encode(&[
        desc(EfiMemoryType::Conventional, 0, 4096),
        desc(EfiMemoryType::Reserved, 4096, 4 * 1024 * MIB - 4096),
    ]);
    let map = MemoryMap::new(&raw, STRIDE);
    let mut ram = ram();
    let err = init(&map, &mut ram, &mut None).err();
    assert!(matches!(err, Some(MemoryMapError::BitmapDoesNotFit { .. })));
}
