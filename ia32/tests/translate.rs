use ia32::{
    ept::{self, AccessKind, EptAccess, EptCapabilities, EptPointer, EptViolation, MemoryType},
    paging::{self, Entry, Level, PageAccess, PageSize},
    Error, HierarchyKind, Translation,
};
use x86::bits64::paging::PAddr;

/// Flat physical memory the tests lay out tables in.
struct Image(Vec<u8>);

impl Image {
    fn new(size: usize) -> Self {
        Self(vec![0; size])
    }

    fn write_u64(&mut self, address: u64, value: u64) -> &mut Self {
        let address = address as usize;
        self.0[address..address + 8].copy_from_slice(&value.to_le_bytes());
        self
    }

    fn write_u32(&mut self, address: u64, value: u32) -> &mut Self {
        let address = address as usize;
        self.0[address..address + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    fn bytes(&self) -> &[u8] {
        &self.0
    }
}

const PML4: u64 = 0x1000;
const PDPT: u64 = 0x2000;
const PD: u64 = 0x3000;
const PT: u64 = 0x4000;

/// PML4 index 1, PDPT index 2, PD index 3, PT index 4, offset 0x567.
const ADDRESS: u64 = 1 << 39 | 2 << 30 | 3 << 21 | 4 << 12 | 0x567;

/// Entry addresses used by `ADDRESS`, root first.
const ENTRIES: [u64; 4] = [PML4 + 8, PDPT + 2 * 8, PD + 3 * 8, PT + 4 * 8];

/// A complete 4 KiB mapping of `ADDRESS` to frame 0xabcde.
fn four_level_image() -> Image {
    let mut image = Image::new(0x5000);
    image
        .write_u64(ENTRIES[0], PDPT | 0x7)
        .write_u64(ENTRIES[1], PD | 0x7)
        .write_u64(ENTRIES[2], PT | 0x7)
        .write_u64(ENTRIES[3], 0xabcd_e000 | 0x3);
    image
}

#[test]
fn translates_4kb_page() {
    let image = four_level_image();

    let translation = paging::translate_4level(image.bytes(), PML4, ADDRESS, true).unwrap();
    assert_eq!(translation.physical_address, PAddr::from(0xabcd_e567u64));
    assert_eq!(translation.page_size, PageSize::Size4K);
    // The leaf is supervisor only and nothing sets XD.
    assert_eq!(translation.access, PageAccess::WRITE | PageAccess::EXECUTE);
}

#[test]
fn walk_path_names_every_entry() {
    let image = four_level_image();

    let translation = paging::translate_4level(image.bytes(), PML4, ADDRESS, true).unwrap();
    let path = &translation.path;

    assert_eq!(path.len(), 4);
    for ((step, level), address) in path.iter().zip(Level::ALL).zip(ENTRIES) {
        assert_eq!(step.level, level);
        assert_eq!(step.address, address);
    }
    assert_eq!(path[3].entry, 0xabcd_e003);
}

#[test]
fn translates_1gb_page() {
    let mut image = Image::new(0x3000);
    image
        .write_u64(PML4, PDPT | 0x3)
        .write_u64(PDPT + 8, 0x4000_0000 | 0x83);

    let translation = paging::translate_4level(image.bytes(), PML4, 0x4000_0abc, true).unwrap();
    assert_eq!(translation.physical_address, PAddr::from(0x4000_0abcu64));
    assert_eq!(translation.page_size, PageSize::Size1G);
    assert_eq!(translation.path.len(), 2);
}

#[test]
fn reserved_physical_address_bits_fault() {
    let pde = 1 << 51 | 0x20_0000 | 0x83;
    let mut image = Image::new(0x4000);
    image
        .write_u64(PML4, PDPT | 0x3)
        .write_u64(PDPT, PD | 0x3)
        .write_u64(PD, pde);

    let expected = Error::ReservedBitsSet {
        level: Level::Pd,
        entry: pde,
    };
    assert_eq!(
        paging::translate_4level(image.bytes(), PML4, 0x1234, true),
        Err(expected)
    );
    assert_eq!(Entry::decode(pde, Level::Pd), Err(expected));
}

#[test]
fn not_present_reports_the_level() {
    for (level, address) in Level::ALL.into_iter().zip(ENTRIES) {
        let mut image = four_level_image();
        image.write_u64(address, 0);

        assert_eq!(
            paging::translate_4level(image.bytes(), PML4, ADDRESS, true),
            Err(Error::NotPresent { level }),
            "entry at {} cleared",
            level
        );
    }
}

#[test]
fn permissions_are_combined_across_levels() {
    let mut image = four_level_image();
    // Read-only, supervisor PML4 entry above a user writable leaf.
    image
        .write_u64(ENTRIES[0], PDPT | 0x1)
        .write_u64(ENTRIES[3], 0xabcd_e000 | 0x7);

    let translation = paging::translate_4level(image.bytes(), PML4, ADDRESS, true).unwrap();
    assert_eq!(translation.access, PageAccess::EXECUTE);

    // XD on the PD entry clears execute for the whole walk.
    image.write_u64(ENTRIES[2], 1 << 63 | PT | 0x7);
    let translation = paging::translate_4level(image.bytes(), PML4, ADDRESS, true).unwrap();
    assert_eq!(translation.access, PageAccess::empty());

    // Without EFER.NXE the same bit is reserved.
    assert_eq!(
        paging::translate_4level(image.bytes(), PML4, ADDRESS, false),
        Err(Error::ReservedBitsSet {
            level: Level::Pd,
            entry: 1 << 63 | PT | 0x7
        })
    );
}

#[test]
fn non_canonical_addresses_are_rejected() {
    let image = four_level_image();

    assert_eq!(
        paging::translate_4level(image.bytes(), PML4, 0x0000_8000_0000_0000, true),
        Err(Error::NonCanonicalAddress {
            address: 0x0000_8000_0000_0000
        })
    );
}

#[test]
fn translates_legacy_4kb_page() {
    // PD index 1, PT index 3
    let address = 0x0040_3123;
    let mut image = Image::new(0x3000);
    image
        .write_u32(0x1000 + 4, 0x2000 | 0x7)
        .write_u32(0x2000 + 3 * 4, 0x0009_a000 | 0x3);

    let translation = paging::translate_legacy32(image.bytes(), 0x1000, address, true).unwrap();
    assert_eq!(translation.physical_address, PAddr::from(0x9_a123u64));
    assert_eq!(translation.page_size, PageSize::Size4K);
    assert_eq!(translation.access, PageAccess::WRITE | PageAccess::EXECUTE);
    assert_eq!(translation.path[0].address, 0x1004);
    assert_eq!(translation.path[1].address, 0x200c);
}

#[test]
fn legacy_large_pages_need_pse() {
    let mut image = Image::new(0x2000);
    image.write_u32(0x1000, 0x0040_0083);

    let translation = paging::translate_legacy32(image.bytes(), 0x1000, 0x1234, true).unwrap();
    assert_eq!(translation.physical_address, PAddr::from(0x40_1234u64));
    assert_eq!(translation.page_size, PageSize::Size4M);

    // Without CR4.PSE bit 7 is ignored and the entry references a table.
    assert_eq!(
        paging::translate_legacy32(image.bytes(), 0x1000, 0x1234, false),
        Err(Error::TableOutOfBounds {
            level: Level::Pt,
            address: 0x40_0004
        })
    );
}

/// An EPT hierarchy granting RWX down to the page table.
fn ept_image(pte_index: u64, pte: u64) -> Image {
    let mut image = Image::new(0x5000);
    image
        .write_u64(PML4, PDPT | 0x7)
        .write_u64(PDPT, PD | 0x7)
        .write_u64(PD, PT | 0x7)
        .write_u64(PT + pte_index * 8, pte);
    image
}

#[test]
fn translates_ept_4kb_page() {
    // Read-only, write-back
    let image = ept_image(0x12, 0x7_7000 | 6 << 3 | 0b001);

    let translation =
        ept::translate(image.bytes(), PML4, 0x1_2345, EptCapabilities::empty()).unwrap();
    assert_eq!(translation.physical_address, PAddr::from(0x7_7345u64));
    assert_eq!(translation.access, EptAccess::READ);
    assert_eq!(translation.memory_type, MemoryType::WriteBack);

    assert_eq!(translation.violation(AccessKind::Read), None);
    assert_eq!(
        translation.violation(AccessKind::Write),
        Some(EptViolation::WRITE | EptViolation::READABLE)
    );
    assert_eq!(
        translation.violation(AccessKind::Execute).map(|q| q.bits()),
        Some(0b1100)
    );
}

#[test]
fn reserved_ept_memory_type_is_a_misconfiguration() {
    let pte = 0x5000 | 7 << 3 | 0b111;
    let image = ept_image(0, pte);

    assert_eq!(
        ept::translate(image.bytes(), PML4, 0, EptCapabilities::all()),
        Err(Error::MisconfiguredMemoryType {
            level: Level::Pt,
            entry: pte
        })
    );
}

#[test]
fn ept_pointer_locates_the_root() {
    let image = ept_image(0, 0x9000 | 6 << 3 | 0b111);
    let eptp = EptPointer::new(PML4, MemoryType::WriteBack, false).unwrap();

    let kind = HierarchyKind::Ept {
        capabilities: EptCapabilities::all(),
    };
    let translation = ia32::translate(image.bytes(), eptp.root(), 0xfff, kind).unwrap();

    let Translation::Ept(translation) = translation else {
        panic!("expected an EPT translation");
    };
    assert_eq!(translation.physical_address, PAddr::from(0x9fffu64));
    assert_eq!(translation.access, EptAccess::READ | EptAccess::WRITE | EptAccess::EXECUTE);
    assert_eq!(translation.path.len(), 4);
}
