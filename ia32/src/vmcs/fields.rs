//! Architectural VMCS fields.
//!
//! Every constant is built through the codec. Names follow the SDM, grouped by
//! field type: [`control`], [`ro`] (VM-exit information), [`guest`] and
//! [`host`].

use super::VmcsField;

/// Control fields, including the VM-exit and VM-entry controls.
pub mod control {
    use crate::vmcs::{FieldType, FieldWidth, VmcsField};

    const fn word(index: u16) -> VmcsField {
        VmcsField::full(FieldType::Control, FieldWidth::Word, index)
    }

    const fn quadword(index: u16) -> VmcsField {
        VmcsField::full(FieldType::Control, FieldWidth::Quadword, index)
    }

    const fn doubleword(index: u16) -> VmcsField {
        VmcsField::full(FieldType::Control, FieldWidth::Doubleword, index)
    }

    const fn natural(index: u16) -> VmcsField {
        VmcsField::full(FieldType::Control, FieldWidth::Natural, index)
    }

    pub const VIRTUAL_PROCESSOR_IDENTIFIER: VmcsField = word(0x00);             // 0x0000
    pub const POSTED_INTERRUPT_NOTIFICATION_VECTOR: VmcsField = word(0x01);     // 0x0002
    pub const EPTP_INDEX: VmcsField = word(0x02);                               // 0x0004

    pub const IO_BITMAP_A_ADDRESS: VmcsField = quadword(0x00);                  // 0x2000
    pub const IO_BITMAP_B_ADDRESS: VmcsField = quadword(0x01);                  // 0x2002
    pub const MSR_BITMAP_ADDRESS: VmcsField = quadword(0x02);                   // 0x2004
    pub const VMEXIT_MSR_STORE_ADDRESS: VmcsField = quadword(0x03);             // 0x2006
    pub const VMEXIT_MSR_LOAD_ADDRESS: VmcsField = quadword(0x04);              // 0x2008
    pub const VMENTRY_MSR_LOAD_ADDRESS: VmcsField = quadword(0x05);             // 0x200a
    pub const EXECUTIVE_VMCS_POINTER: VmcsField = quadword(0x06);               // 0x200c
    pub const PML_ADDRESS: VmcsField = quadword(0x07);                          // 0x200e
    pub const TSC_OFFSET: VmcsField = quadword(0x08);                           // 0x2010
    pub const VIRTUAL_APIC_ADDRESS: VmcsField = quadword(0x09);                 // 0x2012
    pub const APIC_ACCESS_ADDRESS: VmcsField = quadword(0x0a);                  // 0x2014
    pub const POSTED_INTERRUPT_DESCRIPTOR_ADDRESS: VmcsField = quadword(0x0b);  // 0x2016
    pub const VMFUNC_CONTROLS: VmcsField = quadword(0x0c);                      // 0x2018
    pub const EPT_POINTER: VmcsField = quadword(0x0d);                          // 0x201a
    pub const EOI_EXIT_BITMAP_0: VmcsField = quadword(0x0e);                    // 0x201c
    pub const EOI_EXIT_BITMAP_1: VmcsField = quadword(0x0f);                    // 0x201e
    pub const EOI_EXIT_BITMAP_2: VmcsField = quadword(0x10);                    // 0x2020
    pub const EOI_EXIT_BITMAP_3: VmcsField = quadword(0x11);                    // 0x2022
    pub const EPT_POINTER_LIST_ADDRESS: VmcsField = quadword(0x12);             // 0x2024
    pub const VMREAD_BITMAP_ADDRESS: VmcsField = quadword(0x13);                // 0x2026
    pub const VMWRITE_BITMAP_ADDRESS: VmcsField = quadword(0x14);               // 0x2028
    pub const VIRTUALIZATION_EXCEPTION_INFORMATION_ADDRESS: VmcsField = quadword(0x15); // 0x202a
    pub const XSS_EXITING_BITMAP: VmcsField = quadword(0x16);                   // 0x202c
    pub const ENCLS_EXITING_BITMAP: VmcsField = quadword(0x17);                 // 0x202e
    pub const TSC_MULTIPLIER: VmcsField = quadword(0x19);                       // 0x2032

    pub const PIN_BASED_VM_EXECUTION_CONTROLS: VmcsField = doubleword(0x00);    // 0x4000
    pub const PROCESSOR_BASED_VM_EXECUTION_CONTROLS: VmcsField = doubleword(0x01); // 0x4002
    pub const EXCEPTION_BITMAP: VmcsField = doubleword(0x02);                   // 0x4004
    pub const PAGEFAULT_ERROR_CODE_MASK: VmcsField = doubleword(0x03);          // 0x4006
    pub const PAGEFAULT_ERROR_CODE_MATCH: VmcsField = doubleword(0x04);         // 0x4008
    pub const CR3_TARGET_COUNT: VmcsField = doubleword(0x05);                   // 0x400a
    pub const VMEXIT_CONTROLS: VmcsField = doubleword(0x06);                    // 0x400c
    pub const VMEXIT_MSR_STORE_COUNT: VmcsField = doubleword(0x07);             // 0x400e
    pub const VMEXIT_MSR_LOAD_COUNT: VmcsField = doubleword(0x08);              // 0x4010
    pub const VMENTRY_CONTROLS: VmcsField = doubleword(0x09);                   // 0x4012
    pub const VMENTRY_MSR_LOAD_COUNT: VmcsField = doubleword(0x0a);             // 0x4014
    pub const VMENTRY_INTERRUPTION_INFORMATION_FIELD: VmcsField = doubleword(0x0b); // 0x4016
    pub const VMENTRY_EXCEPTION_ERROR_CODE: VmcsField = doubleword(0x0c);       // 0x4018
    pub const VMENTRY_INSTRUCTION_LENGTH: VmcsField = doubleword(0x0d);         // 0x401a
    pub const TPR_THRESHOLD: VmcsField = doubleword(0x0e);                      // 0x401c
    pub const SECONDARY_PROCESSOR_BASED_VM_EXECUTION_CONTROLS: VmcsField = doubleword(0x0f); // 0x401e
    pub const PLE_GAP: VmcsField = doubleword(0x10);                            // 0x4020
    pub const PLE_WINDOW: VmcsField = doubleword(0x11);                         // 0x4022

    pub const CR0_GUEST_HOST_MASK: VmcsField = natural(0x00);                   // 0x6000
    pub const CR4_GUEST_HOST_MASK: VmcsField = natural(0x01);                   // 0x6002
    pub const CR0_READ_SHADOW: VmcsField = natural(0x02);                       // 0x6004
    pub const CR4_READ_SHADOW: VmcsField = natural(0x03);                       // 0x6006
    pub const CR3_TARGET_VALUE_0: VmcsField = natural(0x04);                    // 0x6008
    pub const CR3_TARGET_VALUE_1: VmcsField = natural(0x05);                    // 0x600a
    pub const CR3_TARGET_VALUE_2: VmcsField = natural(0x06);                    // 0x600c
    pub const CR3_TARGET_VALUE_3: VmcsField = natural(0x07);                    // 0x600e
}

/// Read-only data fields, written by the processor on VM exit.
pub mod ro {
    use crate::vmcs::{FieldType, FieldWidth, VmcsField};

    const fn quadword(index: u16) -> VmcsField {
        VmcsField::full(FieldType::VmExitInformation, FieldWidth::Quadword, index)
    }

    const fn doubleword(index: u16) -> VmcsField {
        VmcsField::full(FieldType::VmExitInformation, FieldWidth::Doubleword, index)
    }

    const fn natural(index: u16) -> VmcsField {
        VmcsField::full(FieldType::VmExitInformation, FieldWidth::Natural, index)
    }

    pub const GUEST_PHYSICAL_ADDRESS: VmcsField = quadword(0x00);               // 0x2400

    pub const VM_INSTRUCTION_ERROR: VmcsField = doubleword(0x00);               // 0x4400
    pub const EXIT_REASON: VmcsField = doubleword(0x01);                        // 0x4402
    pub const VMEXIT_INTERRUPTION_INFORMATION: VmcsField = doubleword(0x02);    // 0x4404
    pub const VMEXIT_INTERRUPTION_ERROR_CODE: VmcsField = doubleword(0x03);     // 0x4406
    pub const IDT_VECTORING_INFORMATION: VmcsField = doubleword(0x04);          // 0x4408
    pub const IDT_VECTORING_ERROR_CODE: VmcsField = doubleword(0x05);           // 0x440a
    pub const VMEXIT_INSTRUCTION_LENGTH: VmcsField = doubleword(0x06);          // 0x440c
    pub const VMEXIT_INSTRUCTION_INFO: VmcsField = doubleword(0x07);            // 0x440e

    pub const EXIT_QUALIFICATION: VmcsField = natural(0x00);                    // 0x6400
    pub const IO_RCX: VmcsField = natural(0x01);                                // 0x6402
    pub const IO_RSI: VmcsField = natural(0x02);                                // 0x6404
    pub const IO_RDI: VmcsField = natural(0x03);                                // 0x6406
    pub const IO_RIP: VmcsField = natural(0x04);                                // 0x6408
    pub const EXIT_GUEST_LINEAR_ADDRESS: VmcsField = natural(0x05);             // 0x640a
}

/// Guest-state area.
pub mod guest {
    use crate::vmcs::{FieldType, FieldWidth, VmcsField};

    const fn word(index: u16) -> VmcsField {
        VmcsField::full(FieldType::GuestState, FieldWidth::Word, index)
    }

    const fn quadword(index: u16) -> VmcsField {
        VmcsField::full(FieldType::GuestState, FieldWidth::Quadword, index)
    }

    const fn doubleword(index: u16) -> VmcsField {
        VmcsField::full(FieldType::GuestState, FieldWidth::Doubleword, index)
    }

    const fn natural(index: u16) -> VmcsField {
        VmcsField::full(FieldType::GuestState, FieldWidth::Natural, index)
    }

    pub const ES_SELECTOR: VmcsField = word(0x00);                              // 0x0800
    pub const CS_SELECTOR: VmcsField = word(0x01);                              // 0x0802
    pub const SS_SELECTOR: VmcsField = word(0x02);                              // 0x0804
    pub const DS_SELECTOR: VmcsField = word(0x03);                              // 0x0806
    pub const FS_SELECTOR: VmcsField = word(0x04);                              // 0x0808
    pub const GS_SELECTOR: VmcsField = word(0x05);                              // 0x080a
    pub const LDTR_SELECTOR: VmcsField = word(0x06);                            // 0x080c
    pub const TR_SELECTOR: VmcsField = word(0x07);                              // 0x080e
    pub const INTERRUPT_STATUS: VmcsField = word(0x08);                         // 0x0810
    pub const PML_INDEX: VmcsField = word(0x09);                                // 0x0812

    pub const VMCS_LINK_POINTER: VmcsField = quadword(0x00);                    // 0x2800
    pub const DEBUGCTL: VmcsField = quadword(0x01);                             // 0x2802
    pub const PAT: VmcsField = quadword(0x02);                                  // 0x2804
    pub const EFER: VmcsField = quadword(0x03);                                 // 0x2806
    pub const PERF_GLOBAL_CTRL: VmcsField = quadword(0x04);                     // 0x2808
    pub const PDPTE0: VmcsField = quadword(0x05);                               // 0x280a
    pub const PDPTE1: VmcsField = quadword(0x06);                               // 0x280c
    pub const PDPTE2: VmcsField = quadword(0x07);                               // 0x280e
    pub const PDPTE3: VmcsField = quadword(0x08);                               // 0x2810

    pub const ES_LIMIT: VmcsField = doubleword(0x00);                           // 0x4800
    pub const CS_LIMIT: VmcsField = doubleword(0x01);                           // 0x4802
    pub const SS_LIMIT: VmcsField = doubleword(0x02);                           // 0x4804
    pub const DS_LIMIT: VmcsField = doubleword(0x03);                           // 0x4806
    pub const FS_LIMIT: VmcsField = doubleword(0x04);                           // 0x4808
    pub const GS_LIMIT: VmcsField = doubleword(0x05);                           // 0x480a
    pub const LDTR_LIMIT: VmcsField = doubleword(0x06);                         // 0x480c
    pub const TR_LIMIT: VmcsField = doubleword(0x07);                           // 0x480e
    pub const GDTR_LIMIT: VmcsField = doubleword(0x08);                         // 0x4810
    pub const IDTR_LIMIT: VmcsField = doubleword(0x09);                         // 0x4812
    pub const ES_ACCESS_RIGHTS: VmcsField = doubleword(0x0a);                   // 0x4814
    pub const CS_ACCESS_RIGHTS: VmcsField = doubleword(0x0b);                   // 0x4816
    pub const SS_ACCESS_RIGHTS: VmcsField = doubleword(0x0c);                   // 0x4818
    pub const DS_ACCESS_RIGHTS: VmcsField = doubleword(0x0d);                   // 0x481a
    pub const FS_ACCESS_RIGHTS: VmcsField = doubleword(0x0e);                   // 0x481c
    pub const GS_ACCESS_RIGHTS: VmcsField = doubleword(0x0f);                   // 0x481e
    pub const LDTR_ACCESS_RIGHTS: VmcsField = doubleword(0x10);                 // 0x4820
    pub const TR_ACCESS_RIGHTS: VmcsField = doubleword(0x11);                   // 0x4822
    pub const INTERRUPTIBILITY_STATE: VmcsField = doubleword(0x12);             // 0x4824
    pub const ACTIVITY_STATE: VmcsField = doubleword(0x13);                     // 0x4826
    pub const SMBASE: VmcsField = doubleword(0x14);                             // 0x4828
    pub const SYSENTER_CS: VmcsField = doubleword(0x15);                        // 0x482a
    pub const VMX_PREEMPTION_TIMER_VALUE: VmcsField = doubleword(0x17);         // 0x482e

    pub const CR0: VmcsField = natural(0x00);                                   // 0x6800
    pub const CR3: VmcsField = natural(0x01);                                   // 0x6802
    pub const CR4: VmcsField = natural(0x02);                                   // 0x6804
    pub const ES_BASE: VmcsField = natural(0x03);                               // 0x6806
    pub const CS_BASE: VmcsField = natural(0x04);                               // 0x6808
    pub const SS_BASE: VmcsField = natural(0x05);                               // 0x680a
    pub const DS_BASE: VmcsField = natural(0x06);                               // 0x680c
    pub const FS_BASE: VmcsField = natural(0x07);                               // 0x680e
    pub const GS_BASE: VmcsField = natural(0x08);                               // 0x6810
    pub const LDTR_BASE: VmcsField = natural(0x09);                             // 0x6812
    pub const TR_BASE: VmcsField = natural(0x0a);                               // 0x6814
    pub const GDTR_BASE: VmcsField = natural(0x0b);                             // 0x6816
    pub const IDTR_BASE: VmcsField = natural(0x0c);                             // 0x6818
    pub const DR7: VmcsField = natural(0x0d);                                   // 0x681a
    pub const RSP: VmcsField = natural(0x0e);                                   // 0x681c
    pub const RIP: VmcsField = natural(0x0f);                                   // 0x681e
    pub const RFLAGS: VmcsField = natural(0x10);                                // 0x6820
    pub const PENDING_DEBUG_EXCEPTIONS: VmcsField = natural(0x11);              // 0x6822
    pub const SYSENTER_ESP: VmcsField = natural(0x12);                          // 0x6824
    pub const SYSENTER_EIP: VmcsField = natural(0x13);                          // 0x6826
}

/// Host-state area.
pub mod host {
    use crate::vmcs::{FieldType, FieldWidth, VmcsField};

    const fn word(index: u16) -> VmcsField {
        VmcsField::full(FieldType::HostState, FieldWidth::Word, index)
    }

    const fn quadword(index: u16) -> VmcsField {
        VmcsField::full(FieldType::HostState, FieldWidth::Quadword, index)
    }

    const fn doubleword(index: u16) -> VmcsField {
        VmcsField::full(FieldType::HostState, FieldWidth::Doubleword, index)
    }

    const fn natural(index: u16) -> VmcsField {
        VmcsField::full(FieldType::HostState, FieldWidth::Natural, index)
    }

    pub const ES_SELECTOR: VmcsField = word(0x00);                              // 0x0c00
    pub const CS_SELECTOR: VmcsField = word(0x01);                              // 0x0c02
    pub const SS_SELECTOR: VmcsField = word(0x02);                              // 0x0c04
    pub const DS_SELECTOR: VmcsField = word(0x03);                              // 0x0c06
    pub const FS_SELECTOR: VmcsField = word(0x04);                              // 0x0c08
    pub const GS_SELECTOR: VmcsField = word(0x05);                              // 0x0c0a
    pub const TR_SELECTOR: VmcsField = word(0x06);                              // 0x0c0c

    pub const PAT: VmcsField = quadword(0x00);                                  // 0x2c00
    pub const EFER: VmcsField = quadword(0x01);                                 // 0x2c02
    pub const PERF_GLOBAL_CTRL: VmcsField = quadword(0x02);                     // 0x2c04

    pub const SYSENTER_CS: VmcsField = doubleword(0x00);                        // 0x4c00

    pub const CR0: VmcsField = natural(0x00);                                   // 0x6c00
    pub const CR3: VmcsField = natural(0x01);                                   // 0x6c02
    pub const CR4: VmcsField = natural(0x02);                                   // 0x6c04
    pub const FS_BASE: VmcsField = natural(0x03);                               // 0x6c06
    pub const GS_BASE: VmcsField = natural(0x04);                               // 0x6c08
    pub const TR_BASE: VmcsField = natural(0x05);                               // 0x6c0a
    pub const GDTR_BASE: VmcsField = natural(0x06);                             // 0x6c0c
    pub const IDTR_BASE: VmcsField = natural(0x07);                             // 0x6c0e
    pub const SYSENTER_ESP: VmcsField = natural(0x08);                          // 0x6c10
    pub const SYSENTER_EIP: VmcsField = natural(0x09);                          // 0x6c12
    pub const RSP: VmcsField = natural(0x0a);                                   // 0x6c14
    pub const RIP: VmcsField = natural(0x0b);                                   // 0x6c16
}

/// Every named field, keyed by `<type>_<name>` in lower case.
pub static FIELDS: &[(&str, VmcsField)] = &[
    ("control_virtual_processor_identifier", control::VIRTUAL_PROCESSOR_IDENTIFIER),
    ("control_posted_interrupt_notification_vector", control::POSTED_INTERRUPT_NOTIFICATION_VECTOR),
    ("control_eptp_index", control::EPTP_INDEX),
    ("control_io_bitmap_a_address", control::IO_BITMAP_A_ADDRESS),
    ("control_io_bitmap_b_address", control::IO_BITMAP_B_ADDRESS),
    ("control_msr_bitmap_address", control::MSR_BITMAP_ADDRESS),
    ("control_vmexit_msr_store_address", control::VMEXIT_MSR_STORE_ADDRESS),
    ("control_vmexit_msr_load_address", control::VMEXIT_MSR_LOAD_ADDRESS),
    ("control_vmentry_msr_load_address", control::VMENTRY_MSR_LOAD_ADDRESS),
    ("control_executive_vmcs_pointer", control::EXECUTIVE_VMCS_POINTER),
    ("control_pml_address", control::PML_ADDRESS),
    ("control_tsc_offset", control::TSC_OFFSET),
    ("control_virtual_apic_address", control::VIRTUAL_APIC_ADDRESS),
    ("control_apic_access_address", control::APIC_ACCESS_ADDRESS),
    ("control_posted_interrupt_descriptor_address", control::POSTED_INTERRUPT_DESCRIPTOR_ADDRESS),
    ("control_vmfunc_controls", control::VMFUNC_CONTROLS),
    ("control_ept_pointer", control::EPT_POINTER),
    ("control_eoi_exit_bitmap_0", control::EOI_EXIT_BITMAP_0),
    ("control_eoi_exit_bitmap_1", control::EOI_EXIT_BITMAP_1),
    ("control_eoi_exit_bitmap_2", control::EOI_EXIT_BITMAP_2),
    ("control_eoi_exit_bitmap_3", control::EOI_EXIT_BITMAP_3),
    ("control_ept_pointer_list_address", control::EPT_POINTER_LIST_ADDRESS),
    ("control_vmread_bitmap_address", control::VMREAD_BITMAP_ADDRESS),
    ("control_vmwrite_bitmap_address", control::VMWRITE_BITMAP_ADDRESS),
    ("control_virtualization_exception_information_address", control::VIRTUALIZATION_EXCEPTION_INFORMATION_ADDRESS),
    ("control_xss_exiting_bitmap", control::XSS_EXITING_BITMAP),
    ("control_encls_exiting_bitmap", control::ENCLS_EXITING_BITMAP),
    ("control_tsc_multiplier", control::TSC_MULTIPLIER),
    ("control_pin_based_vm_execution_controls", control::PIN_BASED_VM_EXECUTION_CONTROLS),
    ("control_processor_based_vm_execution_controls", control::PROCESSOR_BASED_VM_EXECUTION_CONTROLS),
    ("control_exception_bitmap", control::EXCEPTION_BITMAP),
    ("control_pagefault_error_code_mask", control::PAGEFAULT_ERROR_CODE_MASK),
    ("control_pagefault_error_code_match", control::PAGEFAULT_ERROR_CODE_MATCH),
    ("control_cr3_target_count", control::CR3_TARGET_COUNT),
    ("control_vmexit_controls", control::VMEXIT_CONTROLS),
    ("control_vmexit_msr_store_count", control::VMEXIT_MSR_STORE_COUNT),
    ("control_vmexit_msr_load_count", control::VMEXIT_MSR_LOAD_COUNT),
    ("control_vmentry_controls", control::VMENTRY_CONTROLS),
    ("control_vmentry_msr_load_count", control::VMENTRY_MSR_LOAD_COUNT),
    ("control_vmentry_interruption_information_field", control::VMENTRY_INTERRUPTION_INFORMATION_FIELD),
    ("control_vmentry_exception_error_code", control::VMENTRY_EXCEPTION_ERROR_CODE),
    ("control_vmentry_instruction_length", control::VMENTRY_INSTRUCTION_LENGTH),
    ("control_tpr_threshold", control::TPR_THRESHOLD),
    ("control_secondary_processor_based_vm_execution_controls", control::SECONDARY_PROCESSOR_BASED_VM_EXECUTION_CONTROLS),
    ("control_ple_gap", control::PLE_GAP),
    ("control_ple_window", control::PLE_WINDOW),
    ("control_cr0_guest_host_mask", control::CR0_GUEST_HOST_MASK),
    ("control_cr4_guest_host_mask", control::CR4_GUEST_HOST_MASK),
    ("control_cr0_read_shadow", control::CR0_READ_SHADOW),
    ("control_cr4_read_shadow", control::CR4_READ_SHADOW),
    ("control_cr3_target_value_0", control::CR3_TARGET_VALUE_0),
    ("control_cr3_target_value_1", control::CR3_TARGET_VALUE_1),
    ("control_cr3_target_value_2", control::CR3_TARGET_VALUE_2),
    ("control_cr3_target_value_3", control::CR3_TARGET_VALUE_3),
    ("ro_guest_physical_address", ro::GUEST_PHYSICAL_ADDRESS),
    ("ro_vm_instruction_error", ro::VM_INSTRUCTION_ERROR),
    ("ro_exit_reason", ro::EXIT_REASON),
    ("ro_vmexit_interruption_information", ro::VMEXIT_INTERRUPTION_INFORMATION),
    ("ro_vmexit_interruption_error_code", ro::VMEXIT_INTERRUPTION_ERROR_CODE),
    ("ro_idt_vectoring_information", ro::IDT_VECTORING_INFORMATION),
    ("ro_idt_vectoring_error_code", ro::IDT_VECTORING_ERROR_CODE),
    ("ro_vmexit_instruction_length", ro::VMEXIT_INSTRUCTION_LENGTH),
    ("ro_vmexit_instruction_info", ro::VMEXIT_INSTRUCTION_INFO),
    ("ro_exit_qualification", ro::EXIT_QUALIFICATION),
    ("ro_io_rcx", ro::IO_RCX),
    ("ro_io_rsi", ro::IO_RSI),
    ("ro_io_rdi", ro::IO_RDI),
    ("ro_io_rip", ro::IO_RIP),
    ("ro_exit_guest_linear_address", ro::EXIT_GUEST_LINEAR_ADDRESS),
    ("guest_es_selector", guest::ES_SELECTOR),
    ("guest_cs_selector", guest::CS_SELECTOR),
    ("guest_ss_selector", guest::SS_SELECTOR),
    ("guest_ds_selector", guest::DS_SELECTOR),
    ("guest_fs_selector", guest::FS_SELECTOR),
    ("guest_gs_selector", guest::GS_SELECTOR),
    ("guest_ldtr_selector", guest::LDTR_SELECTOR),
    ("guest_tr_selector", guest::TR_SELECTOR),
    ("guest_interrupt_status", guest::INTERRUPT_STATUS),
    ("guest_pml_index", guest::PML_INDEX),
    ("guest_vmcs_link_pointer", guest::VMCS_LINK_POINTER),
    ("guest_debugctl", guest::DEBUGCTL),
    ("guest_pat", guest::PAT),
    ("guest_efer", guest::EFER),
    ("guest_perf_global_ctrl", guest::PERF_GLOBAL_CTRL),
    ("guest_pdpte0", guest::PDPTE0),
    ("guest_pdpte1", guest::PDPTE1),
    ("guest_pdpte2", guest::PDPTE2),
    ("guest_pdpte3", guest::PDPTE3),
    ("guest_es_limit", guest::ES_LIMIT),
    ("guest_cs_limit", guest::CS_LIMIT),
    ("guest_ss_limit", guest::SS_LIMIT),
    ("guest_ds_limit", guest::DS_LIMIT),
    ("guest_fs_limit", guest::FS_LIMIT),
    ("guest_gs_limit", guest::GS_LIMIT),
    ("guest_ldtr_limit", guest::LDTR_LIMIT),
    ("guest_tr_limit", guest::TR_LIMIT),
    ("guest_gdtr_limit", guest::GDTR_LIMIT),
    ("guest_idtr_limit", guest::IDTR_LIMIT),
    ("guest_es_access_rights", guest::ES_ACCESS_RIGHTS),
    ("guest_cs_access_rights", guest::CS_ACCESS_RIGHTS),
    ("guest_ss_access_rights", guest::SS_ACCESS_RIGHTS),
    ("guest_ds_access_rights", guest::DS_ACCESS_RIGHTS),
    ("guest_fs_access_rights", guest::FS_ACCESS_RIGHTS),
    ("guest_gs_access_rights", guest::GS_ACCESS_RIGHTS),
    ("guest_ldtr_access_rights", guest::LDTR_ACCESS_RIGHTS),
    ("guest_tr_access_rights", guest::TR_ACCESS_RIGHTS),
    ("guest_interruptibility_state", guest::INTERRUPTIBILITY_STATE),
    ("guest_activity_state", guest::ACTIVITY_STATE),
    ("guest_smbase", guest::SMBASE),
    ("guest_sysenter_cs", guest::SYSENTER_CS),
    ("guest_vmx_preemption_timer_value", guest::VMX_PREEMPTION_TIMER_VALUE),
    ("guest_cr0", guest::CR0),
    ("guest_cr3", guest::CR3),
    ("guest_cr4", guest::CR4),
    ("guest_es_base", guest::ES_BASE),
    ("guest_cs_base", guest::CS_BASE),
    ("guest_ss_base", guest::SS_BASE),
    ("guest_ds_base", guest::DS_BASE),
    ("guest_fs_base", guest::FS_BASE),
    ("guest_gs_base", guest::GS_BASE),
    ("guest_ldtr_base", guest::LDTR_BASE),
    ("guest_tr_base", guest::TR_BASE),
    ("guest_gdtr_base", guest::GDTR_BASE),
    ("guest_idtr_base", guest::IDTR_BASE),
    ("guest_dr7", guest::DR7),
    ("guest_rsp", guest::RSP),
    ("guest_rip", guest::RIP),
    ("guest_rflags", guest::RFLAGS),
    ("guest_pending_debug_exceptions", guest::PENDING_DEBUG_EXCEPTIONS),
    ("guest_sysenter_esp", guest::SYSENTER_ESP),
    ("guest_sysenter_eip", guest::SYSENTER_EIP),
    ("host_es_selector", host::ES_SELECTOR),
    ("host_cs_selector", host::CS_SELECTOR),
    ("host_ss_selector", host::SS_SELECTOR),
    ("host_ds_selector", host::DS_SELECTOR),
    ("host_fs_selector", host::FS_SELECTOR),
    ("host_gs_selector", host::GS_SELECTOR),
    ("host_tr_selector", host::TR_SELECTOR),
    ("host_pat", host::PAT),
    ("host_efer", host::EFER),
    ("host_perf_global_ctrl", host::PERF_GLOBAL_CTRL),
    ("host_sysenter_cs", host::SYSENTER_CS),
    ("host_cr0", host::CR0),
    ("host_cr3", host::CR3),
    ("host_cr4", host::CR4),
    ("host_fs_base", host::FS_BASE),
    ("host_gs_base", host::GS_BASE),
    ("host_tr_base", host::TR_BASE),
    ("host_gdtr_base", host::GDTR_BASE),
    ("host_idtr_base", host::IDTR_BASE),
    ("host_sysenter_esp", host::SYSENTER_ESP),
    ("host_sysenter_eip", host::SYSENTER_EIP),
    ("host_rsp", host::RSP),
    ("host_rip", host::RIP),
];

/// Looks up a field by name. Both `guest_rip` and `guest::RIP` are accepted,
/// in any case.
pub fn by_name(name: &str) -> Option<VmcsField> {
    let (module, field) = name
        .split_once("::")
        .or_else(|| name.split_once('_'))?;

    FIELDS
        .iter()
        .find(|(key, _)| {
            key.split_once('_').map_or(false, |(key_module, key_field)| {
                key_module.eq_ignore_ascii_case(module) && key_field.eq_ignore_ascii_case(field)
            })
        })
        .map(|(_, field)| *field)
}

/// Returns the name of `field`. The `High` half of a 64-bit field has the
/// name of the complete field.
pub fn name_of(field: VmcsField) -> Option<&'static str> {
    let field = field.full_field();

    FIELDS
        .iter()
        .find(|(_, candidate)| *candidate == field)
        .map(|(name, _)| *name)
}

const_assert_eq!(guest::RIP.encode(), 0x681e);
const_assert_eq!(ro::GUEST_PHYSICAL_ADDRESS.encode(), 0x2400);
const_assert_eq!(host::SYSENTER_CS.encode(), 0x4c00);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn identifiers_are_unique() {
        let encodings: HashSet<u16> = FIELDS.iter().map(|(_, field)| field.encode()).collect();
        let names: HashSet<&str> = FIELDS.iter().map(|(name, _)| *name).collect();

        assert_eq!(FIELDS.len(), 154);
        assert_eq!(encodings.len(), FIELDS.len());
        assert_eq!(names.len(), FIELDS.len());
    }

    #[test]
    fn every_field_decodes_to_itself() {
        for (name, field) in FIELDS {
            let decoded = VmcsField::decode(field.encode().into());
            assert_eq!(decoded.as_ref(), Ok(field), "{}", name);
            assert_eq!(name_of(*field), Some(*name));
        }
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(by_name("guest_rip"), Some(guest::RIP));
        assert_eq!(by_name("GUEST::RIP"), Some(guest::RIP));
        assert_eq!(by_name("control_ept_pointer"), Some(control::EPT_POINTER));
        assert_eq!(by_name("ro_io_rsi").map(VmcsField::encode), Some(0x6404));
        assert_eq!(by_name("guest_nothing"), None);
        assert_eq!(by_name("rip"), None);
    }

    #[test]
    fn high_half_shares_the_name() {
        let high = control::TSC_OFFSET.high().unwrap();

        assert_eq!(high.encode(), 0x2011);
        assert_eq!(name_of(high), Some("control_tsc_offset"));
    }

    #[test]
    fn matches_x86_crate() {
        use x86::vmx::vmcs;

        assert_eq!(u32::from(guest::RIP.encode()), vmcs::guest::RIP);
        assert_eq!(u32::from(host::RIP.encode()), vmcs::host::RIP);
        assert_eq!(u32::from(guest::ES_SELECTOR.encode()), vmcs::guest::ES_SELECTOR);
        assert_eq!(u32::from(control::EPT_POINTER.encode()), vmcs::control::EPTP_FULL);
        assert_eq!(
            control::EPT_POINTER.high().map(|field| u32::from(field.encode())),
            Some(vmcs::control::EPTP_HIGH)
        );
        assert_eq!(
            u32::from(control::VIRTUAL_PROCESSOR_IDENTIFIER.encode()),
            vmcs::control::VPID
        );
        assert_eq!(
            u32::from(ro::GUEST_PHYSICAL_ADDRESS.encode()),
            vmcs::ro::GUEST_PHYSICAL_ADDR_FULL
        );
        assert_eq!(u32::from(ro::EXIT_REASON.encode()), vmcs::ro::EXIT_REASON);
        assert_eq!(u32::from(ro::EXIT_QUALIFICATION.encode()), vmcs::ro::EXIT_QUALIFICATION);
    }
}
